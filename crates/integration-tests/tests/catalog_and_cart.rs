//! Catalog reads through the cache, admin writes that invalidate it, and
//! cart editing with locally computed totals.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use rust_decimal::Decimal;
use secrecy::SecretString;
use shopswift_client::ApiError;
use shopswift_client::api::{NewProduct, ProductQuery, ReviewInput};
use shopswift_core::{CartItemId, Money, PricingConfig, ProductId, calculate_totals};
use shopswift_integration_tests::FakeShop;

fn token(shop: &FakeShop, email: &str, is_admin: bool) -> SecretString {
    let user = shop.add_user(email, "secret", is_admin);
    SecretString::from(shop.issue_token(user.id))
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_product_list_is_served_from_cache() {
    let shop = FakeShop::start().await;
    shop.add_product("Desk Lamp", "49.99", 5);
    shop.add_product("Floor Lamp", "89.00", 2);
    let api = shop.api_client();
    let query = ProductQuery::default().search("lamp");

    let first = api.products(&query).await.unwrap();
    shop.rename_product(ProductId::new(1), "Renamed");
    let second = api.products(&query).await.unwrap();

    assert_eq!(first.total, 2);
    assert_eq!(first, second);
    assert_eq!(shop.hits("GET /api/products"), 1);

    // A different query is a different cache entry
    api.products(&ProductQuery::default()).await.unwrap();
    assert_eq!(shop.hits("GET /api/products"), 2);
}

#[tokio::test]
async fn test_categories_are_cached() {
    let shop = FakeShop::start().await;
    shop.add_category("Lighting");
    let api = shop.api_client();

    let first = api.categories().await.unwrap();
    let second = api.categories().await.unwrap();

    assert_eq!(first.first().map(|c| c.name.as_str()), Some("Lighting"));
    assert_eq!(first, second);
    assert_eq!(shop.hits("GET /api/products/categories"), 1);
}

#[tokio::test]
async fn test_product_detail_resolves_image_url() {
    let shop = FakeShop::start().await;
    let id = shop.add_product("Desk Lamp", "49.99", 5);
    let api = shop.api_client();

    let detail = api.product(id).await.unwrap();
    let image = api.image_url(detail.product.image.as_deref()).unwrap();

    assert_eq!(detail.product.price, Decimal::new(4999, 2));
    assert!(image.starts_with("http://127.0.0.1:"));
    assert!(image.ends_with(&format!("/uploads/products/{id}.png")));
}

#[tokio::test]
async fn test_missing_product_is_not_found() {
    let shop = FakeShop::start().await;
    let api = shop.api_client();

    let err = api.product(ProductId::new(404)).await.unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)));
    assert_eq!(err.detail(), Some("Product not found"));
}

#[tokio::test]
async fn test_oversized_page_is_rejected_before_request() {
    let shop = FakeShop::start().await;
    let api = shop.api_client();

    let err = api
        .products(&ProductQuery::default().page(0, 500))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidInput(_)));
    assert_eq!(shop.total_hits(), 0);
}

#[tokio::test]
async fn test_admin_writes_invalidate_catalog() {
    let shop = FakeShop::start().await;
    let lamp = shop.add_product("Desk Lamp", "49.99", 5);
    let admin = token(&shop, "root@example.com", true);
    let api = shop.api_client();

    assert!(api.featured_products(8).await.unwrap().is_empty());

    let toggled = api.authorized(&admin).toggle_featured(lamp).await.unwrap();
    assert!(toggled.is_featured);

    let featured = api.featured_products(8).await.unwrap();
    assert_eq!(featured.len(), 1);
    assert_eq!(shop.hits("GET /api/products/featured"), 2);

    let created = api
        .authorized(&admin)
        .create_product(&NewProduct {
            name: "Bookshelf".to_owned(),
            description: None,
            price: Decimal::new(12000, 2),
            stock_quantity: 3,
            category_id: None,
            image: None,
            is_featured: false,
        })
        .await
        .unwrap();
    let page = api.products(&ProductQuery::default()).await.unwrap();
    assert!(page.data.iter().any(|p| p.id == created.id));
}

#[tokio::test]
async fn test_regular_user_cannot_use_admin_endpoints() {
    let shop = FakeShop::start().await;
    let lamp = shop.add_product("Desk Lamp", "49.99", 5);
    let customer = token(&shop, "ada@example.com", false);
    let api = shop.api_client();

    let err = api
        .authorized(&customer)
        .toggle_featured(lamp)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Forbidden(_)));
}

#[tokio::test]
async fn test_review_refreshes_cached_detail() {
    let shop = FakeShop::start().await;
    let lamp = shop.add_product("Desk Lamp", "49.99", 5);
    let customer = token(&shop, "ada@example.com", false);
    let api = shop.api_client();

    let before = api.product(lamp).await.unwrap();
    assert!(before.reviews.is_empty());

    let review = ReviewInput {
        rating: 4,
        comment: Some("Bright enough".to_owned()),
    };
    api.authorized(&customer)
        .create_review(lamp, &review)
        .await
        .unwrap();

    let after = api.product(lamp).await.unwrap();
    assert_eq!(after.reviews.len(), 1);
    assert_eq!(after.product.review_count, Some(1));

    let err = api
        .authorized(&customer)
        .create_review(lamp, &review)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_cart_editing_and_totals() {
    let shop = FakeShop::start().await;
    let lamp = shop.add_product("Desk Lamp", "49.99", 5);
    let shelf = shop.add_product("Bookshelf", "30.01", 5);
    let customer = token(&shop, "ada@example.com", false);
    let api = shop.api_client();
    let cart_api = api.authorized(&customer);

    assert!(cart_api.cart().await.unwrap().is_empty());

    cart_api.add_to_cart(lamp, 1).await.unwrap();
    cart_api.add_to_cart(lamp, 1).await.unwrap();
    cart_api.add_to_cart(shelf, 3).await.unwrap();

    let cart = cart_api.cart().await.unwrap();
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.item_count(), 5);

    let shelf_line = cart
        .items
        .iter()
        .find(|item| item.product.id == shelf)
        .unwrap()
        .id;
    cart_api.update_cart_item(shelf_line, 1).await.unwrap();

    let cart = cart_api.cart().await.unwrap();
    let totals = calculate_totals(&cart.line_items(), &PricingConfig::cart()).unwrap();
    assert_eq!(totals.subtotal, Money::new(Decimal::new(12999, 2)));
    assert_eq!(totals.tax.to_string(), "$13.00");
    assert!(!totals.shipping_included);
    assert_eq!(totals.total.to_string(), "$142.99");

    cart_api.remove_cart_item(shelf_line).await.unwrap();
    assert_eq!(cart_api.cart().await.unwrap().item_count(), 2);

    cart_api.clear_cart().await.unwrap();
    assert!(cart_api.cart().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_rejects_bad_quantities() {
    let shop = FakeShop::start().await;
    let lamp = shop.add_product("Desk Lamp", "49.99", 1);
    let customer = token(&shop, "ada@example.com", false);
    let api = shop.api_client();
    let cart_api = api.authorized(&customer);

    let err = cart_api.add_to_cart(lamp, 0).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let err = cart_api.add_to_cart(lamp, 2).await.unwrap_err();
    assert_eq!(err.detail(), Some("Insufficient stock"));

    let err = cart_api
        .remove_cart_item(CartItemId::new(999))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_cart_requires_token() {
    let shop = FakeShop::start().await;
    let api = shop.api_client();
    let bogus = SecretString::from("bogus".to_owned());

    let err = api.authorized(&bogus).cart().await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized(_)));
}
