//! `PostgreSQL`-backed product and order stores.
//!
//! Queries are bound at runtime; the dynamic search filter is assembled with
//! `sqlx::QueryBuilder` so that `find` and `count` share one WHERE-clause
//! builder and can never drift apart.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

use mercato_core::{Category, OrderId, Price, ProductId};

use crate::models::{NewOrder, NewProduct, Order, OrderLine, Product, ProductPatch};
use crate::store::{OrderStore, ProductFilter, ProductSort, ProductStore, StoreError};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

const PRODUCT_COLUMNS: &str = "id, name, category, price, stock, photo, created_at";

/// A raw product row as stored in `PostgreSQL`.
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    category: String,
    price: Decimal,
    stock: i32,
    photo: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let category = Category::parse(&row.category).map_err(|e| {
            StoreError::DataCorruption(format!("invalid category in database: {e}"))
        })?;
        let price = Price::parse(row.price)
            .map_err(|e| StoreError::DataCorruption(format!("invalid price in database: {e}")))?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            category,
            price,
            stock: row.stock,
            photo: row.photo,
            created_at: row.created_at,
        })
    }
}

/// Escape `LIKE` pattern metacharacters so that user search text is treated
/// as a literal substring.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Append the WHERE clause for `filter` to `builder`.
///
/// Both `find` and `count` go through here so their filters stay identical.
fn apply_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if filter.is_empty() {
        return;
    }

    builder.push(" WHERE ");
    let mut clauses = builder.separated(" AND ");

    if let Some(name) = &filter.name_contains {
        clauses.push("name ILIKE ");
        clauses.push_bind_unseparated(format!("%{}%", escape_like(name)));
    }
    if let Some(max_price) = filter.max_price {
        clauses.push("price <= ");
        clauses.push_bind_unseparated(max_price.amount());
    }
    if let Some(category) = &filter.category {
        clauses.push("category = ");
        clauses.push_bind_unseparated(category.as_str().to_owned());
    }
}

/// `PostgreSQL`-backed [`ProductStore`].
#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    /// Create a new product store over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    #[tracing::instrument(name = "store::find_product_by_id", skip(self))]
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, category, price, stock, photo, created_at \
             FROM products WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    #[tracing::instrument(name = "store::find_products", skip(self))]
    async fn find(
        &self,
        filter: &ProductFilter,
        sort: Option<ProductSort>,
        limit: Option<i64>,
        skip: Option<i64>,
    ) -> Result<Vec<Product>, StoreError> {
        let mut builder = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        apply_filter(&mut builder, filter);

        builder.push(match sort {
            Some(ProductSort::PriceAsc) => " ORDER BY price ASC, id ASC",
            Some(ProductSort::PriceDesc) => " ORDER BY price DESC, id ASC",
            Some(ProductSort::NewestFirst) => " ORDER BY created_at DESC, id DESC",
            // Store default order: insertion order
            None => " ORDER BY id ASC",
        });

        if let Some(limit) = limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }
        if let Some(skip) = skip {
            builder.push(" OFFSET ");
            builder.push_bind(skip);
        }

        let rows: Vec<ProductRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    #[tracing::instrument(name = "store::count_products", skip(self))]
    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM products");
        apply_filter(&mut builder, filter);

        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.unsigned_abs())
    }

    #[tracing::instrument(name = "store::distinct_categories", skip(self))]
    async fn distinct_categories(&self) -> Result<Vec<Category>, StoreError> {
        let values: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category")
                .fetch_all(&self.pool)
                .await?;

        values
            .iter()
            .map(|value| {
                Category::parse(value).map_err(|e| {
                    StoreError::DataCorruption(format!("invalid category in database: {e}"))
                })
            })
            .collect()
    }

    #[tracing::instrument(name = "store::create_product", skip(self, product))]
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "INSERT INTO products (name, category, price, stock, photo) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, category, price, stock, photo, created_at",
        )
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(product.price.amount())
        .bind(product.stock)
        .bind(&product.photo)
        .fetch_one(&self.pool)
        .await?;

        Product::try_from(row)
    }

    #[tracing::instrument(name = "store::update_product", skip(self, patch))]
    async fn update(&self, id: ProductId, patch: ProductPatch) -> Result<Product, StoreError> {
        if patch.is_empty() {
            return self.find_by_id(id).await?.ok_or(StoreError::NotFound);
        }

        let mut builder = QueryBuilder::new("UPDATE products SET ");
        let mut assignments = builder.separated(", ");

        if let Some(name) = &patch.name {
            assignments.push("name = ");
            assignments.push_bind_unseparated(name.clone());
        }
        if let Some(category) = &patch.category {
            assignments.push("category = ");
            assignments.push_bind_unseparated(category.as_str().to_owned());
        }
        if let Some(price) = patch.price {
            assignments.push("price = ");
            assignments.push_bind_unseparated(price.amount());
        }
        if let Some(stock) = patch.stock {
            assignments.push("stock = ");
            assignments.push_bind_unseparated(stock);
        }
        if let Some(photo) = &patch.photo {
            assignments.push("photo = ");
            assignments.push_bind_unseparated(photo.clone());
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id.as_i32());
        builder.push(format!(" RETURNING {PRODUCT_COLUMNS}"));

        let row: Option<ProductRow> = builder.build_query_as().fetch_optional(&self.pool).await?;
        row.ok_or(StoreError::NotFound).and_then(Product::try_from)
    }

    #[tracing::instrument(name = "store::delete_product", skip(self))]
    async fn delete(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// A raw order row as stored in `PostgreSQL`.
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    items: sqlx::types::Json<Vec<OrderLine>>,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            items: row.items.0,
            created_at: row.created_at,
        }
    }
}

/// `PostgreSQL`-backed [`OrderStore`].
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new order store over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    #[tracing::instrument(name = "store::create_order", skip(self, order))]
    async fn create(&self, order: &NewOrder) -> Result<Order, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "INSERT INTO orders (items) VALUES ($1) RETURNING id, items, created_at",
        )
        .bind(sqlx::types::Json(&order.items))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_literals() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_apply_filter_empty_adds_no_where() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        apply_filter(&mut builder, &ProductFilter::default());
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM products");
    }

    #[test]
    fn test_apply_filter_combines_predicates_with_and() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        let filter = ProductFilter {
            name_contains: Some("shirt".to_string()),
            max_price: Some(Price::parse(Decimal::new(500, 0)).expect("non-negative")),
            category: None,
        };
        apply_filter(&mut builder, &filter);
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM products WHERE name ILIKE $1 AND price <= $2"
        );
    }
}
