//! Catalog service: cache-aside reads, write paths and invalidation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{instrument, warn};

use mercato_core::{Category, Price, ProductId};

use crate::blob::BlobStore;
use crate::cache::CacheStore;
use crate::catalog::query::{SearchParams, build_query};
use crate::catalog::{CatalogError, InvalidationRequest, keys};
use crate::models::{NewProduct, Product, ProductDraft, ProductPatch};
use crate::store::{ProductFilter, ProductSort, ProductStore};

/// How many products the latest-products read returns.
const LATEST_PRODUCTS_LIMIT: i64 = 5;

/// One page of search results.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total_pages: u32,
    pub page: u32,
}

/// Orchestrates the product store, blob store and cache store.
///
/// Reads follow the cache-aside pattern; each write persists first, then
/// consumes exactly one [`InvalidationRequest`] before reporting success.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ProductStore>,
    blobs: Arc<dyn BlobStore>,
    cache: CacheStore,
    page_size: u32,
}

impl CatalogService {
    /// Create a new catalog service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ProductStore>,
        blobs: Arc<dyn BlobStore>,
        cache: CacheStore,
        page_size: u32,
    ) -> Self {
        Self {
            store,
            blobs,
            cache,
            page_size,
        }
    }

    // =========================================================================
    // Read paths (cache-aside)
    // =========================================================================

    /// The five most recently created products.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails on a cache miss.
    #[instrument(skip(self))]
    pub async fn latest_products(&self) -> Result<Vec<Product>, CatalogError> {
        if let Some(products) = self.cached::<Vec<Product>>(keys::LATEST_PRODUCTS).await {
            return Ok(products);
        }

        let products = self
            .store
            .find(
                &ProductFilter::default(),
                Some(ProductSort::NewestFirst),
                Some(LATEST_PRODUCTS_LIMIT),
                None,
            )
            .await?;
        self.populate(keys::LATEST_PRODUCTS, &products).await;
        Ok(products)
    }

    /// Distinct category values across the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails on a cache miss.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        if let Some(categories) = self.cached::<Vec<Category>>(keys::CATEGORIES).await {
            return Ok(categories);
        }

        let categories = self.store.distinct_categories().await?;
        self.populate(keys::CATEGORIES, &categories).await;
        Ok(categories)
    }

    /// The unfiltered product list for the admin panel.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails on a cache miss.
    #[instrument(skip(self))]
    pub async fn admin_products(&self) -> Result<Vec<Product>, CatalogError> {
        if let Some(products) = self.cached::<Vec<Product>>(keys::ALL_PRODUCTS).await {
            return Ok(products);
        }

        let products = self
            .store
            .find(&ProductFilter::default(), None, None, None)
            .await?;
        self.populate(keys::ALL_PRODUCTS, &products).await;
        Ok(products)
    }

    /// A single product by id.
    ///
    /// Absent ids surface as `NotFound` and are not cached; the id-keyed
    /// namespace only ever holds products that exist, so writes know which
    /// key to invalidate.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist, or a
    /// store error if the lookup fails.
    #[instrument(skip(self))]
    pub async fn product_by_id(&self, id: ProductId) -> Result<Product, CatalogError> {
        let key = keys::product(id);
        if let Some(product) = self.cached::<Product>(&key).await {
            return Ok(product);
        }

        let product = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound)?;
        self.populate(&key, &product).await;
        Ok(product)
    }

    /// Filtered, sorted and paged product search. Never cached.
    ///
    /// Runs two store queries with the identical filter: one for the page
    /// contents, one for the total matching count.
    ///
    /// # Errors
    ///
    /// Returns an error if either store query fails.
    #[instrument(skip(self))]
    pub async fn search(&self, params: &SearchParams) -> Result<ProductPage, CatalogError> {
        let (filter, sort, paging) = build_query(params, self.page_size);

        let products = self
            .store
            .find(&filter, sort, Some(paging.limit), Some(paging.skip))
            .await?;
        let total = self.store.count(&filter).await?;

        let total_pages = total.div_ceil(u64::from(self.page_size));
        Ok(ProductPage {
            products,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            page: paging.page,
        })
    }

    // =========================================================================
    // Write paths
    // =========================================================================

    /// Create a product from a staged photo and raw form fields.
    ///
    /// On validation failure with a staged photo present, the staged file is
    /// removed before returning.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if the photo or any required field
    /// is missing, `CatalogError::Blob` if the upload fails, or a store
    /// error if persisting fails.
    #[instrument(skip(self, draft, photo))]
    pub async fn create_product(
        &self,
        draft: ProductDraft,
        photo: Option<PathBuf>,
    ) -> Result<Product, CatalogError> {
        let Some(photo) = photo else {
            return Err(CatalogError::Validation("photo is required".to_string()));
        };

        let fields = match validate_new_product(draft) {
            Ok(fields) => fields,
            Err(error) => {
                remove_staged_file(&photo).await;
                return Err(error);
            }
        };

        let photo_url = self.blobs.upload(&photo).await?;

        let product = self
            .store
            .create(NewProduct {
                name: fields.name,
                category: fields.category,
                price: fields.price,
                stock: fields.stock,
                photo: photo_url,
            })
            .await?;

        remove_staged_file(&photo).await;

        self.invalidate(InvalidationRequest {
            product: true,
            admin: true,
            product_id: None,
        })
        .await;

        Ok(product)
    }

    /// Apply a partial update to an existing product.
    ///
    /// Only supplied, non-empty fields are overwritten. A new photo releases
    /// the previous blob fire-and-forget before the new upload.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist,
    /// `CatalogError::Validation` for invalid field values,
    /// `CatalogError::Blob` if the new photo upload fails, or a store error
    /// if persisting fails.
    #[instrument(skip(self, draft, photo))]
    pub async fn update_product(
        &self,
        id: ProductId,
        draft: ProductDraft,
        photo: Option<PathBuf>,
    ) -> Result<Product, CatalogError> {
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound)?;

        let mut patch = draft_to_patch(draft)?;

        if let Some(staged) = photo {
            let old_reference = existing.photo.clone();
            let blobs = Arc::clone(&self.blobs);
            tokio::spawn(async move {
                if let Err(error) = blobs.delete(&old_reference).await {
                    warn!(%error, reference = %old_reference, "failed to release old photo");
                }
            });

            let photo_url = self.blobs.upload(&staged).await?;
            remove_staged_file(&staged).await;
            patch.photo = Some(photo_url);
        }

        let updated = self.store.update(id, patch).await?;

        self.invalidate(InvalidationRequest {
            product: true,
            admin: true,
            product_id: Some(id),
        })
        .await;

        Ok(updated)
    }

    /// Delete a product, releasing its photo blob best-effort.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist, or a
    /// store error if the deletion fails.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound)?;

        if let Err(error) = self.blobs.delete(&existing.photo).await {
            warn!(%error, reference = %existing.photo, "failed to release product photo");
        }

        self.store.delete(id).await?;

        self.invalidate(InvalidationRequest {
            product: true,
            admin: true,
            product_id: Some(id),
        })
        .await;

        Ok(())
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Consume an invalidation request, deleting every affected cache key.
    ///
    /// Deleting an absent key is a no-op, so this is safely callable from
    /// any write path - including ones outside the catalog, such as order
    /// placement - without knowledge of which keys currently exist.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, request: InvalidationRequest) {
        if request.product {
            self.cache.delete(keys::LATEST_PRODUCTS).await;
            self.cache.delete(keys::CATEGORIES).await;
        }
        if request.admin {
            self.cache.delete(keys::ALL_PRODUCTS).await;
        }
        if let Some(id) = request.product_id {
            self.cache.delete(&keys::product(id)).await;
        }
    }

    // =========================================================================
    // Cache codec
    // =========================================================================

    /// Read and decode a cached snapshot. Undecodable entries are dropped
    /// and treated as a miss: the cache is a performance layer, never a
    /// source of truth.
    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.cache.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(%error, key, "discarding undecodable cache entry");
                self.cache.delete(key).await;
                None
            }
        }
    }

    /// Encode and store a snapshot under `key`.
    async fn populate<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.cache.set(key, raw).await,
            Err(error) => warn!(%error, key, "failed to serialize cache entry"),
        }
    }
}

/// Validated create fields (photo URL still pending upload).
struct ValidatedFields {
    name: String,
    category: Category,
    price: Price,
    stock: i32,
}

/// Validate the create payload: every field must be present and non-empty,
/// price and stock must be positive.
fn validate_new_product(draft: ProductDraft) -> Result<ValidatedFields, CatalogError> {
    let missing = || CatalogError::Validation("name, category, stock and price are required".to_string());

    let name = draft.name.filter(|s| !s.trim().is_empty()).ok_or_else(missing)?;
    let category = draft
        .category
        .as_deref()
        .and_then(|raw| Category::parse(raw).ok())
        .ok_or_else(missing)?;
    let price = draft
        .price
        .filter(|amount| !amount.is_zero())
        .and_then(|amount| Price::parse(amount).ok())
        .ok_or_else(missing)?;
    let stock = draft.stock.filter(|&n| n > 0).ok_or_else(missing)?;

    Ok(ValidatedFields {
        name,
        category,
        price,
        stock,
    })
}

/// Convert raw update fields into a patch, skipping absent and empty values.
fn draft_to_patch(draft: ProductDraft) -> Result<ProductPatch, CatalogError> {
    let mut patch = ProductPatch::default();

    if let Some(name) = draft.name.filter(|s| !s.trim().is_empty()) {
        patch.name = Some(name);
    }
    if let Some(raw) = draft.category.as_deref()
        && let Ok(category) = Category::parse(raw)
    {
        patch.category = Some(category);
    }
    if let Some(amount) = draft.price.filter(|amount| !amount.is_zero()) {
        let price = Price::parse(amount)
            .map_err(|e| CatalogError::Validation(e.to_string()))?;
        patch.price = Some(price);
    }
    if let Some(stock) = draft.stock.filter(|&n| n != 0) {
        if stock < 0 {
            return Err(CatalogError::Validation(
                "stock cannot be negative".to_string(),
            ));
        }
        patch.stock = Some(stock);
    }

    Ok(patch)
}

/// Remove a staged upload. Failures are logged and swallowed; cleanup never
/// masks the primary outcome of the request.
async fn remove_staged_file(path: &Path) {
    if let Err(error) = tokio::fs::remove_file(path).await {
        warn!(%error, path = %path.display(), "failed to remove staged upload");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::blob::MemoryBlobStore;
    use crate::catalog::query::SortDirection;
    use crate::store::MemoryProductStore;

    use super::*;

    const PAGE_SIZE: u32 = 8;

    struct Harness {
        service: CatalogService,
        store: Arc<MemoryProductStore>,
        blobs: Arc<MemoryBlobStore>,
        cache: CacheStore,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryProductStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let cache = CacheStore::new();
        let service = CatalogService::new(
            Arc::clone(&store) as Arc<dyn ProductStore>,
            Arc::clone(&blobs) as Arc<dyn BlobStore>,
            cache.clone(),
            PAGE_SIZE,
        );
        Harness {
            service,
            store,
            blobs,
            cache,
        }
    }

    fn draft(name: &str, category: &str, price: i64, stock: i32) -> ProductDraft {
        ProductDraft {
            name: Some(name.to_string()),
            category: Some(category.to_string()),
            price: Some(Decimal::new(price, 0)),
            stock: Some(stock),
        }
    }

    /// Write a throwaway staged file, as the multipart handler would.
    async fn stage_file() -> PathBuf {
        let path = std::env::temp_dir().join(format!("mercato-test-{}.jpg", Uuid::new_v4()));
        tokio::fs::write(&path, b"fake image bytes").await.unwrap();
        path
    }

    async fn seed(service: &CatalogService, count: usize) -> Vec<Product> {
        let mut created = Vec::new();
        for i in 0..count {
            let staged = stage_file().await;
            created.push(
                service
                    .create_product(draft(&format!("product {i}"), "misc", 10 + i as i64, 5), Some(staged))
                    .await
                    .unwrap(),
            );
        }
        created
    }

    // =========================================================================
    // Read paths
    // =========================================================================

    #[tokio::test]
    async fn test_latest_products_returns_five_newest() {
        let h = harness();
        let created = seed(&h.service, 6).await;

        let latest = h.service.latest_products().await.unwrap();
        assert_eq!(latest.len(), 5);
        // Newest first
        assert_eq!(latest.first().unwrap().id, created.last().unwrap().id);
        assert!(h.cache.has(keys::LATEST_PRODUCTS));
    }

    #[tokio::test]
    async fn test_latest_products_served_from_cache() {
        let h = harness();
        seed(&h.service, 2).await;

        let first_read = h.service.latest_products().await.unwrap();

        // Write directly to the store, bypassing the service and therefore
        // invalidation; a second read must still see the cached snapshot.
        h.store
            .create(NewProduct {
                name: "sneaky".to_string(),
                category: Category::parse("misc").unwrap(),
                price: Price::parse(Decimal::ONE).unwrap(),
                stock: 1,
                photo: "https://blobs.test/sneaky.jpg".to_string(),
            })
            .await
            .unwrap();

        let second_read = h.service.latest_products().await.unwrap();
        assert_eq!(second_read, first_read);
    }

    #[tokio::test]
    async fn test_latest_products_decode_failure_falls_open_to_store() {
        let h = harness();
        seed(&h.service, 1).await;

        h.cache
            .set(keys::LATEST_PRODUCTS, "not valid json".to_string())
            .await;

        let latest = h.service.latest_products().await.unwrap();
        assert_eq!(latest.len(), 1);
        // The bad entry was replaced by a fresh snapshot
        let raw = h.cache.get(keys::LATEST_PRODUCTS).await.unwrap();
        assert!(serde_json::from_str::<Vec<Product>>(&raw).is_ok());
    }

    #[tokio::test]
    async fn test_categories_cache_aside() {
        let h = harness();
        let staged = stage_file().await;
        h.service
            .create_product(draft("a", "Shoes", 10, 1), Some(staged))
            .await
            .unwrap();

        let categories = h.service.categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories.first().unwrap().as_str(), "shoes");
        assert!(h.cache.has(keys::CATEGORIES));
    }

    #[tokio::test]
    async fn test_admin_products_returns_everything_unfiltered() {
        let h = harness();
        seed(&h.service, 7).await;

        let all = h.service.admin_products().await.unwrap();
        assert_eq!(all.len(), 7);
        assert!(h.cache.has(keys::ALL_PRODUCTS));
    }

    #[tokio::test]
    async fn test_product_by_id_caches_found_product() {
        let h = harness();
        let created = seed(&h.service, 1).await;
        let id = created.first().unwrap().id;

        let product = h.service.product_by_id(id).await.unwrap();
        assert_eq!(product.id, id);
        assert!(h.cache.has(&keys::product(id)));
    }

    #[tokio::test]
    async fn test_product_by_id_absent_is_not_found_and_not_cached() {
        let h = harness();
        let id = ProductId::new(404);

        let result = h.service.product_by_id(id).await;
        assert!(matches!(result, Err(CatalogError::NotFound)));
        assert!(!h.cache.has(&keys::product(id)));
    }

    // =========================================================================
    // Search
    // =========================================================================

    #[tokio::test]
    async fn test_search_seventeen_products_make_three_pages() {
        let h = harness();
        seed(&h.service, 17).await;

        let page = h.service.search(&SearchParams::default()).await.unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.products.len(), 8);
        assert_eq!(page.page, 1);
    }

    #[tokio::test]
    async fn test_search_page_zero_normalizes_to_one() {
        let h = harness();
        seed(&h.service, 3).await;

        let params = SearchParams {
            page: Some(0),
            ..SearchParams::default()
        };
        let page = h.service.search(&params).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.products.len(), 3);
    }

    #[tokio::test]
    async fn test_search_filters_by_name_substring() {
        let h = harness();
        let staged = stage_file().await;
        h.service
            .create_product(draft("Linen Shirt", "clothes", 450, 3), Some(staged))
            .await
            .unwrap();
        let staged = stage_file().await;
        h.service
            .create_product(draft("Wool Socks", "clothes", 90, 9), Some(staged))
            .await
            .unwrap();

        let params = SearchParams {
            search: Some("shirt".to_string()),
            max_price: Some(Decimal::new(500, 0)),
            ..SearchParams::default()
        };
        let page = h.service.search(&params).await.unwrap();
        assert_eq!(page.products.len(), 1);
        assert_eq!(page.products.first().unwrap().name, "Linen Shirt");
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_search_sorts_by_price() {
        let h = harness();
        seed(&h.service, 3).await;

        let params = SearchParams {
            sort: Some(SortDirection::Descending),
            ..SearchParams::default()
        };
        let page = h.service.search(&params).await.unwrap();
        let prices: Vec<Price> = page.products.iter().map(|p| p.price).collect();
        let mut sorted = prices.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(prices, sorted);
    }

    #[tokio::test]
    async fn test_search_results_are_never_cached() {
        let h = harness();
        seed(&h.service, 2).await;

        h.service.search(&SearchParams::default()).await.unwrap();
        assert!(!h.cache.has(keys::LATEST_PRODUCTS));
        assert!(!h.cache.has(keys::ALL_PRODUCTS));
    }

    // =========================================================================
    // Create
    // =========================================================================

    #[tokio::test]
    async fn test_create_without_photo_is_validation_error() {
        let h = harness();
        let result = h
            .service
            .create_product(draft("a", "misc", 10, 1), None)
            .await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_with_missing_name_removes_staged_file() {
        let h = harness();
        let staged = stage_file().await;

        let incomplete = ProductDraft {
            name: None,
            ..draft("ignored", "misc", 10, 1)
        };
        let result = h.service.create_product(incomplete, Some(staged.clone())).await;

        assert!(matches!(result, Err(CatalogError::Validation(_))));
        // The staged file was cleaned up and nothing was persisted
        assert!(tokio::fs::metadata(&staged).await.is_err());
        assert_eq!(h.store.count(&ProductFilter::default()).await.unwrap(), 0);
        assert!(h.blobs.uploaded().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_zero_stock_is_rejected() {
        let h = harness();
        let staged = stage_file().await;
        let result = h
            .service
            .create_product(draft("a", "misc", 10, 0), Some(staged))
            .await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_success_persists_uploads_and_cleans_up() {
        let h = harness();
        let staged = stage_file().await;

        let product = h
            .service
            .create_product(draft("Linen Shirt", "Clothes", 450, 3), Some(staged.clone()))
            .await
            .unwrap();

        assert_eq!(product.name, "Linen Shirt");
        assert_eq!(product.category.as_str(), "clothes");
        assert!(product.photo.starts_with("https://blobs.test/"));
        assert_eq!(h.blobs.uploaded().len(), 1);
        assert!(tokio::fs::metadata(&staged).await.is_err());
    }

    #[tokio::test]
    async fn test_create_invalidates_list_caches() {
        let h = harness();
        seed(&h.service, 1).await;

        // Warm the list caches
        h.service.latest_products().await.unwrap();
        h.service.categories().await.unwrap();
        h.service.admin_products().await.unwrap();

        let staged = stage_file().await;
        h.service
            .create_product(draft("fresh", "misc", 10, 1), Some(staged))
            .await
            .unwrap();

        assert!(!h.cache.has(keys::LATEST_PRODUCTS));
        assert!(!h.cache.has(keys::CATEGORIES));
        assert!(!h.cache.has(keys::ALL_PRODUCTS));
    }

    #[tokio::test]
    async fn test_create_upload_failure_persists_nothing() {
        let h = harness();
        h.blobs.fail_uploads();
        let staged = stage_file().await;

        let result = h
            .service
            .create_product(draft("a", "misc", 10, 1), Some(staged))
            .await;

        assert!(matches!(result, Err(CatalogError::Blob(_))));
        assert_eq!(h.store.count(&ProductFilter::default()).await.unwrap(), 0);
    }

    // =========================================================================
    // Update
    // =========================================================================

    #[tokio::test]
    async fn test_update_missing_product_is_not_found() {
        let h = harness();
        let result = h
            .service
            .update_product(ProductId::new(99), ProductDraft::default(), None)
            .await;
        assert!(matches!(result, Err(CatalogError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_stock_only_preserves_other_fields() {
        let h = harness();
        let created = seed(&h.service, 1).await;
        let original = created.first().unwrap().clone();

        // Warm the id-keyed and list caches
        h.service.product_by_id(original.id).await.unwrap();
        h.service.latest_products().await.unwrap();
        h.service.admin_products().await.unwrap();

        let stock_only = ProductDraft {
            stock: Some(42),
            ..ProductDraft::default()
        };
        let updated = h
            .service
            .update_product(original.id, stock_only, None)
            .await
            .unwrap();

        assert_eq!(updated.stock, 42);
        assert_eq!(updated.name, original.name);
        assert_eq!(updated.category, original.category);
        assert_eq!(updated.price, original.price);
        assert_eq!(updated.photo, original.photo);

        // Both the id-keyed entry and the list caches were invalidated
        assert!(!h.cache.has(&keys::product(original.id)));
        assert!(!h.cache.has(keys::LATEST_PRODUCTS));
        assert!(!h.cache.has(keys::ALL_PRODUCTS));
    }

    #[tokio::test]
    async fn test_update_reads_after_write_reflect_the_write() {
        let h = harness();
        let created = seed(&h.service, 1).await;
        let id = created.first().unwrap().id;

        h.service.product_by_id(id).await.unwrap();

        let rename = ProductDraft {
            name: Some("renamed".to_string()),
            ..ProductDraft::default()
        };
        h.service.update_product(id, rename, None).await.unwrap();

        let reread = h.service.product_by_id(id).await.unwrap();
        assert_eq!(reread.name, "renamed");
    }

    #[tokio::test]
    async fn test_update_with_new_photo_uploads_and_replaces() {
        let h = harness();
        let created = seed(&h.service, 1).await;
        let original = created.first().unwrap().clone();

        let staged = stage_file().await;
        let updated = h
            .service
            .update_product(original.id, ProductDraft::default(), Some(staged.clone()))
            .await
            .unwrap();

        assert_ne!(updated.photo, original.photo);
        assert_eq!(h.blobs.uploaded().len(), 2);
        assert!(tokio::fs::metadata(&staged).await.is_err());

        // The old blob release is fire-and-forget; give the spawned task a
        // chance to run before asserting on it.
        for _ in 0..20 {
            if h.blobs.deleted().contains(&original.photo) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(h.blobs.deleted().contains(&original.photo));
    }

    #[tokio::test]
    async fn test_update_ignores_empty_fields() {
        let h = harness();
        let created = seed(&h.service, 1).await;
        let original = created.first().unwrap().clone();

        let empty_fields = ProductDraft {
            name: Some(String::new()),
            category: Some(String::new()),
            price: Some(Decimal::ZERO),
            stock: None,
        };
        let updated = h
            .service
            .update_product(original.id, empty_fields, None)
            .await
            .unwrap();

        assert_eq!(updated.name, original.name);
        assert_eq!(updated.category, original.category);
        assert_eq!(updated.price, original.price);
    }

    // =========================================================================
    // Delete
    // =========================================================================

    #[tokio::test]
    async fn test_delete_missing_product_is_not_found() {
        let h = harness();
        let result = h.service.delete_product(ProductId::new(99)).await;
        assert!(matches!(result, Err(CatalogError::NotFound)));
    }

    #[tokio::test]
    async fn test_deleted_product_leaves_no_trace() {
        let h = harness();
        let created = seed(&h.service, 2).await;
        let victim = created.first().unwrap().clone();

        // Warm every cache that could hold the product
        h.service.product_by_id(victim.id).await.unwrap();
        h.service.latest_products().await.unwrap();
        h.service.admin_products().await.unwrap();

        h.service.delete_product(victim.id).await.unwrap();

        // Its id-keyed cache entry is gone and reads show no trace of it
        assert!(!h.cache.has(&keys::product(victim.id)));
        assert!(matches!(
            h.service.product_by_id(victim.id).await,
            Err(CatalogError::NotFound)
        ));
        let latest = h.service.latest_products().await.unwrap();
        assert!(latest.iter().all(|p| p.id != victim.id));

        // The photo blob was released
        assert!(h.blobs.deleted().contains(&victim.photo));
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    #[tokio::test]
    async fn test_invalidate_absent_keys_is_a_noop() {
        let h = harness();
        // Nothing cached; must not error or panic
        h.service
            .invalidate(InvalidationRequest {
                product: true,
                admin: true,
                product_id: Some(ProductId::new(1)),
            })
            .await;
    }

    #[tokio::test]
    async fn test_invalidate_only_touches_requested_namespaces() {
        let h = harness();
        seed(&h.service, 1).await;

        h.service.latest_products().await.unwrap();
        h.service.admin_products().await.unwrap();

        h.service
            .invalidate(InvalidationRequest {
                product: true,
                admin: false,
                product_id: None,
            })
            .await;

        assert!(!h.cache.has(keys::LATEST_PRODUCTS));
        assert!(h.cache.has(keys::ALL_PRODUCTS));
    }
}
