//! In-memory product and order stores.
//!
//! Vec-backed engines with the same observable semantics as the
//! `PostgreSQL` implementations. Used by the test suites and handy for
//! local development without a database.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use mercato_core::{Category, OrderId, ProductId};

use crate::models::{NewOrder, NewProduct, Order, Product, ProductPatch};
use crate::store::{OrderStore, ProductFilter, ProductSort, ProductStore, StoreError};

/// In-memory [`ProductStore`].
#[derive(Default)]
pub struct MemoryProductStore {
    inner: RwLock<ProductTable>,
}

#[derive(Default)]
struct ProductTable {
    next_id: i32,
    rows: Vec<Product>,
}

impl MemoryProductStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(product: &Product, filter: &ProductFilter) -> bool {
    if let Some(name) = &filter.name_contains
        && !product.name.to_lowercase().contains(&name.to_lowercase())
    {
        return false;
    }
    if let Some(max_price) = filter.max_price
        && product.price > max_price
    {
        return false;
    }
    if let Some(category) = &filter.category
        && product.category != *category
    {
        return false;
    }
    true
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let table = self.inner.read().await;
        Ok(table.rows.iter().find(|p| p.id == id).cloned())
    }

    async fn find(
        &self,
        filter: &ProductFilter,
        sort: Option<ProductSort>,
        limit: Option<i64>,
        skip: Option<i64>,
    ) -> Result<Vec<Product>, StoreError> {
        let table = self.inner.read().await;
        let mut results: Vec<Product> = table
            .rows
            .iter()
            .filter(|p| matches(p, filter))
            .cloned()
            .collect();

        match sort {
            Some(ProductSort::PriceAsc) => results.sort_by(|a, b| {
                a.price.cmp(&b.price).then_with(|| a.id.cmp(&b.id))
            }),
            Some(ProductSort::PriceDesc) => results.sort_by(|a, b| {
                b.price.cmp(&a.price).then_with(|| a.id.cmp(&b.id))
            }),
            Some(ProductSort::NewestFirst) => results.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            }),
            // Store default order: insertion order
            None => {}
        }

        let skip = usize::try_from(skip.unwrap_or(0).max(0)).unwrap_or(0);
        let mut page: Vec<Product> = results.into_iter().skip(skip).collect();
        if let Some(limit) = limit {
            page.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
        }
        Ok(page)
    }

    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let table = self.inner.read().await;
        Ok(table.rows.iter().filter(|p| matches(p, filter)).count() as u64)
    }

    async fn distinct_categories(&self) -> Result<Vec<Category>, StoreError> {
        let table = self.inner.read().await;
        let set: BTreeSet<Category> = table.rows.iter().map(|p| p.category.clone()).collect();
        Ok(set.into_iter().collect())
    }

    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut table = self.inner.write().await;
        table.next_id += 1;
        let created = Product {
            id: ProductId::new(table.next_id),
            name: product.name,
            category: product.category,
            price: product.price,
            stock: product.stock,
            photo: product.photo,
            created_at: Utc::now(),
        };
        table.rows.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Product, StoreError> {
        let mut table = self.inner.write().await;
        let product = table
            .rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(category) = patch.category {
            product.category = category;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        if let Some(photo) = patch.photo {
            product.photo = photo;
        }
        Ok(product.clone())
    }

    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        let mut table = self.inner.write().await;
        let before = table.rows.len();
        table.rows.retain(|p| p.id != id);
        if table.rows.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// In-memory [`OrderStore`].
#[derive(Default)]
pub struct MemoryOrderStore {
    inner: RwLock<OrderTable>,
}

#[derive(Default)]
struct OrderTable {
    next_id: i32,
    rows: Vec<Order>,
}

impl MemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all placed orders.
    pub async fn orders(&self) -> Vec<Order> {
        self.inner.read().await.rows.clone()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, order: &NewOrder) -> Result<Order, StoreError> {
        let mut table = self.inner.write().await;
        table.next_id += 1;
        let created = Order {
            id: OrderId::new(table.next_id),
            items: order.items.clone(),
            created_at: Utc::now(),
        };
        table.rows.push(created.clone());
        Ok(created)
    }
}
