//! Product catalog: cache-aside reads, write paths and invalidation.
//!
//! The catalog service sits in front of the product store and the blob
//! store. Reads go through the process-wide cache where possible; every
//! write produces exactly one [`InvalidationRequest`] which the single
//! [`CatalogService::invalidate`](service::CatalogService::invalidate)
//! routine consumes. External write paths (order placement) go through the
//! same routine.

pub mod query;
pub mod service;

use thiserror::Error;

use mercato_core::ProductId;

use crate::blob::BlobError;
use crate::store::StoreError;

pub use query::{Paging, SearchParams, SortDirection, build_query};
pub use service::{CatalogService, ProductPage};

/// Cache key namespace.
///
/// These strings are a compatibility contract; external tooling inspects
/// the cache by these exact keys.
pub mod keys {
    use mercato_core::ProductId;

    /// The five most recently created products.
    pub const LATEST_PRODUCTS: &str = "latest-products";
    /// The distinct category values.
    pub const CATEGORIES: &str = "categories";
    /// The unfiltered admin product list.
    pub const ALL_PRODUCTS: &str = "all-products";

    /// Key of a single product's cached snapshot.
    #[must_use]
    pub fn product(id: ProductId) -> String {
        format!("product-{id}")
    }
}

/// Which cache namespaces a write invalidates.
///
/// Produced once per write and consumed exactly once by
/// [`CatalogService::invalidate`](service::CatalogService::invalidate).
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidationRequest {
    /// Invalidate the public product lists (`latest-products`, `categories`).
    pub product: bool,
    /// Invalidate the admin list (`all-products`).
    pub admin: bool,
    /// Invalidate a specific product's entry (`product-{id}`).
    pub product_id: Option<ProductId>,
}

/// Errors that can occur in catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A write-path input was missing or invalid.
    #[error("{0}")]
    Validation(String),

    /// The target product does not exist.
    #[error("product not found")]
    NotFound,

    /// The blob store rejected an upload.
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// The persistent store failed.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            other => Self::Store(other),
        }
    }
}
