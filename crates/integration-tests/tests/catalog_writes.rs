//! Integration tests for the catalog write endpoints and their cache
//! invalidation.

use axum::http::StatusCode;

use mercato_integration_tests::TestApp;
use mercato_server::store::{ProductFilter, ProductStore};

const PHOTO_BYTES: &[u8] = b"fake image bytes";

fn full_form<'a>() -> Vec<(&'a str, &'a str)> {
    vec![
        ("name", "Linen Shirt"),
        ("category", "Clothes"),
        ("price", "450"),
        ("stock", "3"),
    ]
}

#[tokio::test]
async fn test_create_requires_admin_token() {
    let app = TestApp::new();
    let (status, _) = app
        .send_multipart(
            "POST",
            "/api/v1/product/new",
            false,
            &full_form(),
            Some(("shirt.jpg", PHOTO_BYTES)),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_without_photo_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .send_multipart("POST", "/api/v1/product/new", true, &full_form(), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_create_with_missing_field_persists_nothing() {
    let app = TestApp::new();
    let incomplete = vec![("category", "Clothes"), ("price", "450"), ("stock", "3")];

    let (status, _) = app
        .send_multipart(
            "POST",
            "/api/v1/product/new",
            true,
            &incomplete,
            Some(("shirt.jpg", PHOTO_BYTES)),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        app.store.count(&ProductFilter::default()).await.expect("count"),
        0
    );
    assert!(app.blobs.uploaded().is_empty());
}

#[tokio::test]
async fn test_create_persists_normalizes_and_uploads() {
    let app = TestApp::new();

    let (status, body) = app
        .send_multipart(
            "POST",
            "/api/v1/product/new",
            true,
            &full_form(),
            Some(("shirt.jpg", PHOTO_BYTES)),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["product"]["name"], "Linen Shirt");
    // Category is lowercase-normalized on the way in
    assert_eq!(body["product"]["category"], "clothes");
    assert_eq!(app.blobs.uploaded().len(), 1);

    let photo = body["product"]["photo"].as_str().expect("photo url");
    assert!(photo.starts_with("https://blobs.test/"));
}

#[tokio::test]
async fn test_create_invalidates_warm_list_caches() {
    let app = TestApp::new();
    app.seed_product("existing", "misc", 10, 5).await;

    // Warm the list caches through the read endpoints
    app.get("/api/v1/product/latest").await;
    app.get("/api/v1/product/categories").await;
    app.get_admin("/api/v1/product/admin-products").await;

    app.send_multipart(
        "POST",
        "/api/v1/product/new",
        true,
        &full_form(),
        Some(("shirt.jpg", PHOTO_BYTES)),
    )
    .await;

    assert!(!app.cache.has("latest-products"));
    assert!(!app.cache.has("categories"));
    assert!(!app.cache.has("all-products"));

    // The next read sees the new product
    let (_, body) = app.get("/api/v1/product/latest").await;
    let names: Vec<&str> = body["products"]
        .as_array()
        .expect("products")
        .iter()
        .map(|p| p["name"].as_str().expect("name"))
        .collect();
    assert!(names.contains(&"Linen Shirt"));
}

#[tokio::test]
async fn test_update_missing_product_is_404() {
    let app = TestApp::new();
    let (status, _) = app
        .send_multipart(
            "PUT",
            "/api/v1/product/999",
            true,
            &[("stock", "7")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_stock_only_preserves_fields_and_invalidates() {
    let app = TestApp::new();
    let product = app.seed_product("lamp", "decor", 35, 2).await;
    let path = format!("/api/v1/product/{}", product.id);

    // Warm the id-keyed and list caches
    app.get(&path).await;
    app.get("/api/v1/product/latest").await;
    app.get_admin("/api/v1/product/admin-products").await;

    let (status, body) = app
        .send_multipart("PUT", &path, true, &[("stock", "42")], None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["stock"], 42);
    assert_eq!(body["product"]["name"], "lamp");
    assert_eq!(body["product"]["category"], "decor");
    assert_eq!(body["product"]["photo"], product.photo);

    assert!(!app.cache.has(&format!("product-{}", product.id)));
    assert!(!app.cache.has("latest-products"));
    assert!(!app.cache.has("all-products"));

    // A read strictly after the write reflects the write
    let (_, body) = app.get(&path).await;
    assert_eq!(body["product"]["stock"], 42);
}

#[tokio::test]
async fn test_delete_leaves_no_trace() {
    let app = TestApp::new();
    let product = app.seed_product("ephemeral", "misc", 10, 1).await;
    let path = format!("/api/v1/product/{}", product.id);

    // Warm the caches that could hold the product
    app.get(&path).await;
    app.get("/api/v1/product/latest").await;

    let (status, body) = app.send_multipart("DELETE", &path, true, &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // Id-keyed cache entry is gone, reads 404, lists show no trace
    assert!(!app.cache.has(&format!("product-{}", product.id)));
    let (status, _) = app.get(&path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/v1/product/latest").await;
    assert!(body["products"].as_array().expect("products").is_empty());

    // The photo blob was released
    assert!(app.blobs.deleted().contains(&product.photo));
}

#[tokio::test]
async fn test_delete_missing_product_is_404() {
    let app = TestApp::new();
    let (status, _) = app
        .send_multipart("DELETE", "/api/v1/product/999", true, &[], None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
