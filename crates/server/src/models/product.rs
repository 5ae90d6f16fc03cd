//! Product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mercato_core::{Category, Price, ProductId};

/// A catalog product (domain type).
///
/// The persistent store owns the canonical copy; the cache only ever holds
/// serialized snapshots of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Category, lowercase-normalized.
    pub category: Category,
    /// Non-negative price.
    pub price: Price,
    /// Units in stock.
    pub stock: i32,
    /// Durable URL of the product photo in the blob store.
    pub photo: String,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

/// A validated payload for creating a product.
///
/// Produced by the catalog service after write-path validation; the photo
/// field already holds the durable blob store URL.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: Category,
    pub price: Price,
    pub stock: i32,
    pub photo: String,
}

/// A partial update to a product.
///
/// Fields left as `None` retain their prior value.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub price: Option<Price>,
    pub stock: Option<i32>,
    pub photo: Option<String>,
}

impl ProductPatch {
    /// Returns `true` if no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.photo.is_none()
    }
}

/// Raw, unvalidated product fields as extracted from a multipart request.
///
/// The catalog service validates these on create and filters out absent or
/// empty values on update.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
}
