//! Order route handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::error::AppError;
use crate::models::{NewOrder, Order};
use crate::state::AppState;

#[derive(Serialize)]
pub struct OrderResponse {
    pub success: bool,
    pub message: String,
    pub order: Order,
}

/// Place an order.
///
/// Decrements stock for every ordered product and invalidates the affected
/// catalog caches before responding.
pub async fn place(
    State(state): State<AppState>,
    Json(new_order): Json<NewOrder>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders().place_order(new_order).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            success: true,
            message: "Order placed successfully".to_string(),
            order,
        }),
    ))
}
