//! Product route handlers.

use std::path::{Path as FilePath, PathBuf};

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mercato_core::{Category, ProductId};

use crate::catalog::{SearchParams, SortDirection};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductDraft};
use crate::state::AppState;

// =============================================================================
// Response types
// =============================================================================

#[derive(Serialize)]
pub struct ProductsResponse {
    pub success: bool,
    pub products: Vec<Product>,
}

#[derive(Serialize)]
pub struct CategoriesResponse {
    pub success: bool,
    pub categories: Vec<Category>,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub success: bool,
    pub product: Product,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub products: Vec<Product>,
    #[serde(rename = "totalPage")]
    pub total_page: u32,
}

#[derive(Serialize)]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

// =============================================================================
// Read handlers
// =============================================================================

/// The five most recently created products.
pub async fn latest(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let products = state.catalog().latest_products().await?;
    Ok(Json(ProductsResponse {
        success: true,
        products,
    }))
}

/// Distinct category values.
pub async fn categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let categories = state.catalog().categories().await?;
    Ok(Json(CategoriesResponse {
        success: true,
        categories,
    }))
}

/// Unfiltered product list for the admin panel.
pub async fn admin_products(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let products = state.catalog().admin_products().await?;
    Ok(Json(ProductsResponse {
        success: true,
        products,
    }))
}

/// A single product by id.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.catalog().product_by_id(id).await?;
    Ok(Json(ProductResponse {
        success: true,
        product,
    }))
}

/// Raw search parameters as they arrive on the query string.
///
/// Every field is a string so that malformed numbers coerce to defaults
/// instead of rejecting the request.
#[derive(Debug, Deserialize)]
pub struct ProductSearchQuery {
    pub search: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

impl ProductSearchQuery {
    fn into_params(self) -> SearchParams {
        SearchParams {
            search: self.search,
            max_price: self.price.and_then(|raw| raw.parse().ok()),
            category: self.category,
            sort: self.sort.as_deref().and_then(SortDirection::parse),
            page: self.page.and_then(|raw| raw.parse().ok()),
        }
    }
}

/// Filtered, sorted and paged product search.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<ProductSearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.catalog().search(&query.into_params()).await?;
    Ok(Json(SearchResponse {
        success: true,
        products: page.products,
        total_page: page.total_pages,
    }))
}

// =============================================================================
// Write handlers
// =============================================================================

/// Create a product from a multipart form (admin-only).
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (draft, photo) = extract_product_form(multipart, &state.config().uploads_dir).await?;

    let product = state.catalog().create_product(draft, photo).await?;

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            success: true,
            message: "Product created successfully".to_string(),
            product: Some(product),
        }),
    ))
}

/// Update a product from a multipart form (admin-only).
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (draft, photo) = extract_product_form(multipart, &state.config().uploads_dir).await?;

    let product = state.catalog().update_product(id, draft, photo).await?;

    Ok(Json(MutationResponse {
        success: true,
        message: "Product updated successfully".to_string(),
        product: Some(product),
    }))
}

/// Delete a product (admin-only).
pub async fn remove(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, AppError> {
    state.catalog().delete_product(id).await?;

    Ok(Json(MutationResponse {
        success: true,
        message: "Product deleted successfully".to_string(),
        product: None,
    }))
}

// =============================================================================
// Multipart extraction
// =============================================================================

/// Pull product fields out of a multipart form, staging the photo part (if
/// any) into the uploads directory.
///
/// The staged file is handed to the catalog service, which owns its cleanup
/// on both success and validation failure.
async fn extract_product_form(
    mut multipart: Multipart,
    uploads_dir: &FilePath,
) -> Result<(ProductDraft, Option<PathBuf>), AppError> {
    let mut draft = ProductDraft::default();
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart request: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("name") => draft.name = Some(read_text(field).await?),
            Some("category") => draft.category = Some(read_text(field).await?),
            Some("price") => draft.price = read_text(field).await?.parse().ok(),
            Some("stock") => draft.stock = read_text(field).await?.parse().ok(),
            Some("photo") => photo = stage_photo(field, uploads_dir).await?,
            _ => {}
        }
    }

    Ok((draft, photo))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart field: {e}")))
}

/// Write the photo part to a uniquely named file under `uploads_dir`.
///
/// Empty parts (no file selected) count as no photo.
async fn stage_photo(
    field: axum::extract::multipart::Field<'_>,
    uploads_dir: &FilePath,
) -> Result<Option<PathBuf>, AppError> {
    let file_name = field
        .file_name()
        .map(str::to_owned)
        .unwrap_or_else(|| "photo".to_string());

    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("malformed photo upload: {e}")))?;

    if bytes.is_empty() {
        return Ok(None);
    }

    // Only the final path component of the client-supplied name is used
    let safe_name = FilePath::new(&file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("photo");
    let staged = uploads_dir.join(format!("{}-{safe_name}", Uuid::new_v4()));

    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(|e| AppError::Internal(format!("failed to create uploads dir: {e}")))?;
    tokio::fs::write(&staged, &bytes)
        .await
        .map_err(|e| AppError::Internal(format!("failed to stage upload: {e}")))?;

    Ok(Some(staged))
}
