//! Blob store access for product photos.
//!
//! The catalog hands a locally staged file to the blob store and gets back a
//! durable URL; that URL is what gets persisted on the product. Deleting a
//! previously stored object is best-effort everywhere in the catalog: a
//! failed release is logged, never propagated.
//!
//! Implementations:
//!
//! - [`http`] - HTTP image-CDN client via reqwest (production)
//! - [`memory`] - recording double (tests)

pub mod http;
pub mod memory;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpBlobStore;
pub use memory::MemoryBlobStore;

/// Errors that can occur during blob store operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// Uploading a file failed.
    #[error("blob upload failed: {0}")]
    Upload(String),

    /// Deleting a stored object failed.
    #[error("blob delete failed: {0}")]
    Delete(String),
}

/// External object storage for product photos.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload a local file and return its durable URL.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::Upload`] if the file cannot be read or the
    /// remote store rejects it.
    async fn upload(&self, local_path: &Path) -> Result<String, BlobError>;

    /// Delete a previously stored object by its durable reference.
    ///
    /// Callers treat this as best-effort; a failure must not abort the
    /// surrounding write path.
    async fn delete(&self, reference: &str) -> Result<(), BlobError>;
}
