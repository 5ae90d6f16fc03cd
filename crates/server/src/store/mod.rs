//! Persistent store access for products and orders.
//!
//! The catalog service talks to the store exclusively through the
//! [`ProductStore`] and [`OrderStore`] traits so that the cache and
//! invalidation logic can be exercised against an in-memory engine in tests.
//!
//! Implementations:
//!
//! - [`postgres`] - `PostgreSQL` via sqlx (production)
//! - [`memory`] - in-process Vec-backed engine (tests, local development)

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use mercato_core::{Category, Price, ProductId};

use crate::models::{NewOrder, NewProduct, Order, Product, ProductPatch};

pub use memory::{MemoryOrderStore, MemoryProductStore};
pub use postgres::{PgOrderStore, PgProductStore, create_pool};

/// Errors that can occur during store operations.
///
/// `NotFound` is distinct from `Database`: operating on a missing id is a
/// request-level condition, not a connectivity failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// A filter over products. Empty filter matches everything; predicates are
/// AND-combined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    /// Case-insensitive substring match on the product name.
    pub name_contains: Option<String>,
    /// Upper bound on the price (inclusive).
    pub max_price: Option<Price>,
    /// Exact category match.
    pub category: Option<Category>,
}

impl ProductFilter {
    /// Returns `true` if no predicate is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name_contains.is_none() && self.max_price.is_none() && self.category.is_none()
    }
}

/// Sort order for product queries.
///
/// `None` in a query means the store's default order (insertion order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    NewestFirst,
}

/// Access to the persistent product collection.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Look up a product by id. Returns `Ok(None)` if it does not exist.
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Query products matching `filter`, optionally sorted and paged.
    async fn find(
        &self,
        filter: &ProductFilter,
        sort: Option<ProductSort>,
        limit: Option<i64>,
        skip: Option<i64>,
    ) -> Result<Vec<Product>, StoreError>;

    /// Count products matching `filter`.
    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError>;

    /// Distinct category values across all products.
    async fn distinct_categories(&self) -> Result<Vec<Category>, StoreError>;

    /// Persist a new product.
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Apply a partial update. Fields left `None` retain their prior value.
    ///
    /// Returns `StoreError::NotFound` if the product does not exist.
    async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Product, StoreError>;

    /// Delete a product.
    ///
    /// Returns `StoreError::NotFound` if the product does not exist.
    async fn delete(&self, id: ProductId) -> Result<(), StoreError>;
}

/// Access to the persistent order collection.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order.
    async fn create(&self, order: &NewOrder) -> Result<Order, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = ProductFilter::default();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_filter_with_predicate_is_not_empty() {
        let filter = ProductFilter {
            name_contains: Some("shirt".to_string()),
            ..ProductFilter::default()
        };
        assert!(!filter.is_empty());
    }
}
