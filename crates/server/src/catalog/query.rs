//! Search query construction.
//!
//! Maps the optional search parameters of the product search endpoint into
//! a store filter plus paging. Pure: no I/O, no error conditions - every
//! malformed input falls back to a default instead of failing.

use rust_decimal::Decimal;

use mercato_core::{Category, Price};

use crate::store::{ProductFilter, ProductSort};

/// Requested sort direction for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Parse a direction from a query-string value.
    ///
    /// `"asc"` sorts ascending; any other non-empty value sorts descending.
    /// Empty input means no sort was requested.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        if raw == "asc" {
            Some(Self::Ascending)
        } else {
            Some(Self::Descending)
        }
    }
}

/// Optional search parameters, already coerced from the query string.
///
/// Absent and present-but-empty values are both `None`: absence must not
/// turn into an empty-string match.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    /// Free-text search over product names.
    pub search: Option<String>,
    /// Upper bound on the price (inclusive).
    pub max_price: Option<Decimal>,
    /// Exact category match.
    pub category: Option<String>,
    /// Sort direction over price.
    pub sort: Option<SortDirection>,
    /// 1-based page number.
    pub page: Option<u32>,
}

/// Paging derived from the page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    /// Normalized 1-based page number.
    pub page: u32,
    /// Rows to skip.
    pub skip: i64,
    /// Rows per page.
    pub limit: i64,
}

/// Build a store query from search parameters.
///
/// The returned filter is empty when no parameters are given, so it matches
/// every product. Page numbers of zero (or absent) normalize to 1.
#[must_use]
pub fn build_query(
    params: &SearchParams,
    page_size: u32,
) -> (ProductFilter, Option<ProductSort>, Paging) {
    let filter = ProductFilter {
        name_contains: params
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_owned),
        max_price: params
            .max_price
            .and_then(|amount| Price::parse(amount).ok()),
        category: params
            .category
            .as_deref()
            .and_then(|raw| Category::parse(raw).ok()),
    };

    let sort = params.sort.map(|direction| match direction {
        SortDirection::Ascending => ProductSort::PriceAsc,
        SortDirection::Descending => ProductSort::PriceDesc,
    });

    let page = params.page.unwrap_or(1).max(1);
    let limit = i64::from(page_size);
    let skip = i64::from(page - 1) * limit;

    (filter, sort, Paging { page, skip, limit })
}
