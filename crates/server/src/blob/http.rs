//! HTTP blob store client.
//!
//! Talks to an image-CDN style API: multipart upload of a staged file
//! returns a durable URL; deletion addresses the object by the last path
//! segment of that URL.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};
use url::Url;

use crate::blob::{BlobError, BlobStore};
use crate::config::BlobStoreConfig;

/// Response of a successful upload.
#[derive(serde::Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Blob store client over the image CDN HTTP API.
#[derive(Clone)]
pub struct HttpBlobStore {
    /// HTTP client.
    client: Client,
    /// Base URL of the blob store API.
    endpoint: Url,
    /// Bearer token for authentication.
    token: SecretString,
}

impl std::fmt::Debug for HttpBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBlobStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpBlobStore {
    /// Create a new blob store client.
    #[must_use]
    pub fn new(config: &BlobStoreConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
        }
    }

    fn url(&self, segment: &str) -> Result<Url, BlobError> {
        self.endpoint
            .join(segment)
            .map_err(|e| BlobError::Upload(format!("invalid blob store URL: {e}")))
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    #[instrument(skip(self), fields(path = %local_path.display()))]
    async fn upload(&self, local_path: &Path) -> Result<String, BlobError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| BlobError::Upload(format!("failed to read staged file: {e}")))?;

        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_owned();

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("upload")?)
            .bearer_auth(self.token.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| BlobError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BlobError::Upload(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let result: UploadResponse = response
            .json()
            .await
            .map_err(|e| BlobError::Upload(e.to_string()))?;

        debug!(url = %result.secure_url, "photo uploaded to blob store");
        Ok(result.secure_url)
    }

    #[instrument(skip(self), fields(reference = %reference))]
    async fn delete(&self, reference: &str) -> Result<(), BlobError> {
        // The object id is the last path segment of the durable URL
        let object_id = reference
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BlobError::Delete(format!("malformed blob reference: {reference}")))?;

        let url = self
            .endpoint
            .join(&format!("files/{object_id}"))
            .map_err(|e| BlobError::Delete(format!("invalid blob store URL: {e}")))?;

        let response = self
            .client
            .delete(url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| BlobError::Delete(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BlobError::Delete(format!("HTTP {status}")));
        }

        debug!("blob deleted");
        Ok(())
    }
}
