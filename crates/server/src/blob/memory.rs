//! Recording blob store double for tests.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::blob::{BlobError, BlobStore};

/// In-memory [`BlobStore`] that records uploads and deletes.
///
/// `upload` returns a deterministic URL derived from the staged file name so
/// that tests can assert on what was persisted.
#[derive(Default)]
pub struct MemoryBlobStore {
    uploads: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    fail_uploads: AtomicBool,
}

impl MemoryBlobStore {
    /// Create an empty blob store double.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail.
    pub fn fail_uploads(&self) {
        self.fail_uploads.store(true, Ordering::SeqCst);
    }

    /// URLs returned by uploads so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn uploaded(&self) -> Vec<String> {
        self.uploads.lock().expect("lock poisoned").clone()
    }

    /// References deleted so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        self.deletes.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, local_path: &Path) -> Result<String, BlobError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(BlobError::Upload("simulated upload failure".to_string()));
        }

        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        let url = format!("https://blobs.test/{file_name}");
        self.uploads.lock().expect("lock poisoned").push(url.clone());
        Ok(url)
    }

    async fn delete(&self, reference: &str) -> Result<(), BlobError> {
        self.deletes
            .lock()
            .expect("lock poisoned")
            .push(reference.to_owned());
        Ok(())
    }
}
