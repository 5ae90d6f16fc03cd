//! Integration test harness for Mercato.
//!
//! Builds the real router over in-memory store and blob doubles, so tests
//! exercise the full handler -> service -> cache -> store path without a
//! database or network.
//!
//! # Example
//!
//! ```rust,ignore
//! let app = TestApp::new();
//! let (status, body) = app.get("/api/v1/product/latest").await;
//! assert_eq!(status, StatusCode::OK);
//! assert_eq!(body["success"], true);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tower::ServiceExt;
use uuid::Uuid;

use mercato_core::{Category, Price};
use mercato_server::blob::{BlobStore, MemoryBlobStore};
use mercato_server::cache::CacheStore;
use mercato_server::catalog::CatalogService;
use mercato_server::config::{BlobStoreConfig, ServerConfig};
use mercato_server::models::{NewProduct, Product};
use mercato_server::orders::OrderService;
use mercato_server::routes;
use mercato_server::state::AppState;
use mercato_server::store::{
    MemoryOrderStore, MemoryProductStore, OrderStore, ProductStore,
};

/// Admin token wired into the test configuration.
pub const ADMIN_TOKEN: &str = "integration-test-admin-token";

/// Page size wired into the test configuration.
pub const PAGE_SIZE: u32 = 8;

/// Multipart boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "mercato-test-boundary";

/// A fully wired application over in-memory collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryProductStore>,
    pub orders: Arc<MemoryOrderStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub cache: CacheStore,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Build a router with fresh in-memory state.
    ///
    /// # Panics
    ///
    /// Panics if the static test configuration fails to parse.
    #[must_use]
    pub fn new() -> Self {
        let config = test_config();

        let store = Arc::new(MemoryProductStore::new());
        let orders = Arc::new(MemoryOrderStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let cache = CacheStore::new();

        let catalog = CatalogService::new(
            Arc::clone(&store) as Arc<dyn ProductStore>,
            Arc::clone(&blobs) as Arc<dyn BlobStore>,
            cache.clone(),
            PAGE_SIZE,
        );
        let order_service = OrderService::new(
            Arc::clone(&store) as Arc<dyn ProductStore>,
            Arc::clone(&orders) as Arc<dyn OrderStore>,
            catalog.clone(),
        );

        let state = AppState::new(config, catalog, order_service);
        let router = routes::routes().with_state(state);

        Self {
            router,
            store,
            orders,
            blobs,
            cache,
        }
    }

    /// Seed a product directly into the store, bypassing the service.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory store rejects the product.
    pub async fn seed_product(&self, name: &str, category: &str, price: i64, stock: i32) -> Product {
        self.store
            .create(NewProduct {
                name: name.to_string(),
                category: Category::parse(category).expect("valid category"),
                price: Price::parse(Decimal::new(price, 0)).expect("non-negative price"),
                stock,
                photo: format!("https://blobs.test/{}.jpg", name.replace(' ', "-")),
            })
            .await
            .expect("seeding product")
    }

    /// Send a request and return status plus parsed body.
    ///
    /// JSON bodies are parsed; a non-JSON body (e.g. the plain-text liveness
    /// response) is returned as a JSON string rather than panicking.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be dispatched.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request dispatch");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collect")
            .to_bytes();

        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, body)
    }

    /// GET a path.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or dispatched.
    pub async fn get(&self, path: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("request build");
        self.send(request).await
    }

    /// GET a path with the admin bearer token.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or dispatched.
    pub async fn get_admin(&self, path: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
            .body(Body::empty())
            .expect("request build");
        self.send(request).await
    }

    /// POST a JSON payload.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or dispatched.
    pub async fn post_json(
        &self,
        path: &str,
        payload: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request build");
        self.send(request).await
    }

    /// Send a multipart request with optional admin auth.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or dispatched.
    pub async fn send_multipart(
        &self,
        method: &str,
        path: &str,
        authorized: bool,
        fields: &[(&str, &str)],
        photo: Option<(&str, &[u8])>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(path).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        if authorized {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"));
        }
        let request = builder
            .body(Body::from(multipart_body(fields, photo)))
            .expect("request build");
        self.send(request).await
    }
}

fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://localhost/unused"),
        host: "127.0.0.1".parse().expect("valid host"),
        port: 0,
        uploads_dir: std::env::temp_dir().join(format!("mercato-it-{}", Uuid::new_v4())),
        page_size: PAGE_SIZE,
        blob_store: BlobStoreConfig {
            endpoint: "https://blobs.test/api/".parse().expect("valid endpoint"),
            token: SecretString::from("unused-blob-token"),
        },
        admin_token: SecretString::from(ADMIN_TOKEN),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    }
}

/// Assemble a multipart/form-data body with text fields and an optional
/// photo file part.
#[must_use]
pub fn multipart_body(fields: &[(&str, &str)], photo: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    if let Some((filename, bytes)) = photo {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; \
                 filename=\"{filename}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
