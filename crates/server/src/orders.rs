//! Order placement.
//!
//! Orders are a write path that lives outside the catalog core but still
//! mutates products (stock decrements), so placement must go through the
//! catalog's invalidation routine for every product it touches.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use mercato_core::ProductId;

use crate::catalog::{CatalogService, InvalidationRequest};
use crate::models::{NewOrder, Order, ProductPatch};
use crate::store::{OrderStore, ProductStore, StoreError};

/// Errors that can occur when placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order payload was empty or malformed.
    #[error("{0}")]
    Validation(String),

    /// An ordered product does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Not enough stock to satisfy an order line.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i32,
        available: i32,
    },

    /// The persistent store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Places orders and keeps the product caches honest about it.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn ProductStore>,
    orders: Arc<dyn OrderStore>,
    catalog: CatalogService,
}

impl OrderService {
    /// Create a new order service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ProductStore>,
        orders: Arc<dyn OrderStore>,
        catalog: CatalogService,
    ) -> Self {
        Self {
            store,
            orders,
            catalog,
        }
    }

    /// Place an order: validate stock for every line, decrement it, persist
    /// the order, then invalidate the caches of every affected product.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` for an empty order or non-positive
    /// quantities, `OrderError::ProductNotFound` / `InsufficientStock` per
    /// line, or a store error.
    #[instrument(skip(self, new_order), fields(lines = new_order.items.len()))]
    pub async fn place_order(&self, new_order: NewOrder) -> Result<Order, OrderError> {
        if new_order.items.is_empty() {
            return Err(OrderError::Validation("order has no items".to_string()));
        }
        if new_order.items.iter().any(|line| line.quantity <= 0) {
            return Err(OrderError::Validation(
                "order quantities must be positive".to_string(),
            ));
        }

        // Validate every line before decrementing anything, so an
        // insufficient line late in the order does not leave earlier
        // lines half-applied.
        for line in &new_order.items {
            let product = self
                .store
                .find_by_id(line.product_id)
                .await?
                .ok_or(OrderError::ProductNotFound(line.product_id))?;

            if product.stock < line.quantity {
                return Err(OrderError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: product.stock,
                });
            }
        }

        for line in &new_order.items {
            let product = self
                .store
                .find_by_id(line.product_id)
                .await?
                .ok_or(OrderError::ProductNotFound(line.product_id))?;

            self.store
                .update(
                    line.product_id,
                    ProductPatch {
                        stock: Some(product.stock - line.quantity),
                        ..ProductPatch::default()
                    },
                )
                .await?;
        }

        let order = self.orders.create(&new_order).await?;

        // Stock changed, so every cached view of these products is stale
        for line in &new_order.items {
            self.catalog
                .invalidate(InvalidationRequest {
                    product: true,
                    admin: true,
                    product_id: Some(line.product_id),
                })
                .await;
        }

        Ok(order)
    }
}
