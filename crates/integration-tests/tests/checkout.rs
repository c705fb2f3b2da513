//! Checkout: totals shown before placing an order, the order itself, and
//! the admin status workflow.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use rust_decimal::Decimal;
use secrecy::SecretString;
use shopswift_client::ApiError;
use shopswift_client::api::NewOrder;
use shopswift_core::{Money, OrderId, OrderStatus, PricingConfig, calculate_totals};
use shopswift_integration_tests::FakeShop;
use tempfile::TempDir;

fn token(shop: &FakeShop, email: &str, is_admin: bool) -> SecretString {
    let user = shop.add_user(email, "secret", is_admin);
    SecretString::from(shop.issue_token(user.id))
}

#[tokio::test]
async fn test_checkout_totals_use_configured_pricing() {
    let shop = FakeShop::start().await;
    let lamp = shop.add_product("Desk Lamp", "49.99", 5);
    let customer = token(&shop, "ada@example.com", false);
    let dir = TempDir::new().unwrap();
    let config = shop.config(&dir.path().join("session.json"));
    let api = shop.api_client();

    api.authorized(&customer).add_to_cart(lamp, 1).await.unwrap();
    let cart = api.authorized(&customer).cart().await.unwrap();

    let totals = calculate_totals(&cart.line_items(), &config.checkout_pricing()).unwrap();

    assert!(totals.shipping_included);
    assert_eq!(totals.shipping, Money::new(Decimal::new(1000, 2)));
    assert_eq!(totals.tax.to_string(), "$5.00");
    assert_eq!(totals.total.to_string(), "$64.99");

    // The cart view shows the same subtotal and tax but no shipping
    let cart_totals = calculate_totals(&cart.line_items(), &PricingConfig::cart()).unwrap();
    assert_eq!(cart_totals.subtotal, totals.subtotal);
    assert_eq!(cart_totals.shipping, Money::default());
}

#[tokio::test]
async fn test_place_order_clears_cart_and_reserves_stock() {
    let shop = FakeShop::start().await;
    let lamp = shop.add_product("Desk Lamp", "49.99", 5);
    let customer = token(&shop, "ada@example.com", false);
    let api = shop.api_client();
    let orders_api = api.authorized(&customer);

    orders_api.add_to_cart(lamp, 2).await.unwrap();
    // Warm the catalog cache so the order has something to invalidate
    assert_eq!(api.product(lamp).await.unwrap().product.stock_quantity, 5);

    let order = orders_api
        .place_order(&NewOrder::new("1 Main St, Springfield"))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, Decimal::new(9998, 2));
    assert_eq!(order.items.len(), 1);
    assert!(orders_api.cart().await.unwrap().is_empty());
    assert_eq!(shop.stock(lamp), Some(3));
    assert_eq!(api.product(lamp).await.unwrap().product.stock_quantity, 3);

    let history = orders_api.orders().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(orders_api.order(order.id).await.unwrap(), order);
}

#[tokio::test]
async fn test_empty_cart_cannot_be_ordered() {
    let shop = FakeShop::start().await;
    let customer = token(&shop, "ada@example.com", false);
    let api = shop.api_client();

    let err = api
        .authorized(&customer)
        .place_order(&NewOrder::new("1 Main St"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.detail(), Some("Cart is empty"));
}

#[tokio::test]
async fn test_blank_address_is_rejected_locally() {
    let shop = FakeShop::start().await;
    let customer = token(&shop, "ada@example.com", false);
    let api = shop.api_client();

    let err = api
        .authorized(&customer)
        .place_order(&NewOrder::new("   "))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidInput(_)));
    assert_eq!(shop.hits("POST /api/orders"), 0);
}

#[tokio::test]
async fn test_admin_moves_order_through_statuses() {
    let shop = FakeShop::start().await;
    let lamp = shop.add_product("Desk Lamp", "49.99", 5);
    let customer = token(&shop, "ada@example.com", false);
    let admin = token(&shop, "root@example.com", true);
    let api = shop.api_client();

    api.authorized(&customer).add_to_cart(lamp, 1).await.unwrap();
    let order = api
        .authorized(&customer)
        .place_order(&NewOrder::new("1 Main St"))
        .await
        .unwrap();

    let shipped = api
        .authorized(&admin)
        .update_order_status(order.id, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let seen = api.authorized(&customer).order(order.id).await.unwrap();
    assert_eq!(seen.status, OrderStatus::Shipped);

    let err = api
        .authorized(&customer)
        .update_order_status(order.id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let err = api
        .authorized(&admin)
        .update_order_status(OrderId::new(999), OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}
