//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//!
//! # Products
//! GET    /api/v1/product/latest         - Five most recent products
//! GET    /api/v1/product/categories     - Distinct category values
//! GET    /api/v1/product/admin-products - Unfiltered list (admin-only)
//! GET    /api/v1/product/all            - Filtered/paged search
//! POST   /api/v1/product/new            - Create product (admin-only, multipart)
//! GET    /api/v1/product/{id}           - Single product
//! PUT    /api/v1/product/{id}           - Update product (admin-only, multipart)
//! DELETE /api/v1/product/{id}           - Delete product (admin-only)
//!
//! # Orders
//! POST /api/v1/order/new                - Place an order (decrements stock)
//! ```

pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/latest", get(products::latest))
        .route("/categories", get(products::categories))
        .route("/admin-products", get(products::admin_products))
        .route("/all", get(products::search))
        .route("/new", post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::remove),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/new", post(orders::place))
}

/// Create all routes for the server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/product", product_routes())
        .nest("/api/v1/order", order_routes())
}
