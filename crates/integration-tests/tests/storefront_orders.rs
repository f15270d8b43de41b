//! Integration tests for order placement and cancellation.
//!
//! These tests require:
//! - A migrated and seeded `PostgreSQL` database (`shop-cli migrate && shop-cli seed`)
//! - The storefront server running (`cargo run -p cornershop-storefront`)

use cornershop_integration_tests::{TestClient, create_product, json_body, stock_of};
use reqwest::StatusCode;
use serde_json::json;

// ============================================================================
// Placement
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_place_order_decrements_stock_and_computes_totals() {
    let admin = TestClient::admin().await;
    let product = create_product(&admin, "50.00", 10).await;
    let customer = TestClient::customer().await;

    let response = customer
        .post(
            "/api/orders",
            &json!({ "products": [{ "id": product, "quantity": 2 }] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["message"], "Order placed successfully");
    let order = &body["order"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["subtotal"], "100.00");
    assert_eq!(order["items"][0]["quantity"], 2);
    assert_eq!(order["items"][0]["unit_price"], "50.00");

    let subtotal: f64 = order["subtotal"].as_str().unwrap_or("0").parse().unwrap_or(0.0);
    let tax: f64 = order["tax"].as_str().unwrap_or("0").parse().unwrap_or(0.0);
    let shipping: f64 = order["shipping"].as_str().unwrap_or("0").parse().unwrap_or(0.0);
    let total: f64 = order["total"].as_str().unwrap_or("0").parse().unwrap_or(0.0);
    assert!((subtotal + tax + shipping - total).abs() < 0.001);

    assert_eq!(stock_of(&customer, product).await, 8);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_short_line_rejects_whole_order() {
    let admin = TestClient::admin().await;
    let plenty = create_product(&admin, "10.00", 10).await;
    let scarce = create_product(&admin, "20.00", 1).await;
    let customer = TestClient::customer().await;

    let response = customer
        .post(
            "/api/orders",
            &json!({ "products": [
                { "id": plenty, "quantity": 3 },
                { "id": scarce, "quantity": 2 },
            ] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(response).await;
    let message = body["errors"]["products"][0].as_str().unwrap_or_default();
    assert!(message.contains("Available: 1"), "unexpected message: {message}");

    assert_eq!(stock_of(&customer, plenty).await, 10);
    assert_eq!(stock_of(&customer, scarce).await, 1);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_empty_order_is_rejected() {
    let customer = TestClient::customer().await;
    let response = customer.post("/api/orders", &json!({ "products": [] })).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_orders_require_login() {
    let anonymous = TestClient::anonymous();
    let response = anonymous.get("/api/orders").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Cancellation and ownership
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_cancel_restores_stock_once() {
    let admin = TestClient::admin().await;
    let product = create_product(&admin, "15.00", 5).await;
    let customer = TestClient::customer().await;

    let placed = json_body(
        customer
            .post(
                "/api/orders",
                &json!({ "products": [{ "id": product, "quantity": 4 }] }),
            )
            .await,
    )
    .await;
    let order_id = placed["order"]["id"].as_i64().unwrap_or_default();
    assert_eq!(stock_of(&customer, product).await, 1);

    let response = customer.delete(&format!("/api/orders/{order_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Order cancelled successfully");
    assert_eq!(body["order"]["status"], "cancelled");
    assert_eq!(stock_of(&customer, product).await, 5);

    // A second cancellation is refused and does not restore again.
    let response = customer
        .patch(
            &format!("/api/orders/{order_id}"),
            &json!({ "status": "cancelled" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(stock_of(&customer, product).await, 5);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_other_customers_order_is_forbidden() {
    let admin = TestClient::admin().await;
    let product = create_product(&admin, "12.00", 5).await;
    let owner = TestClient::customer().await;
    let stranger = TestClient::customer().await;

    let placed = json_body(
        owner
            .post(
                "/api/orders",
                &json!({ "products": [{ "id": product, "quantity": 1 }] }),
            )
            .await,
    )
    .await;
    let order_id = placed["order"]["id"].as_i64().unwrap_or_default();

    let response = stranger.get(&format!("/api/orders/{order_id}")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = stranger.delete(&format!("/api/orders/{order_id}")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(stock_of(&owner, product).await, 4);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_customer_cannot_complete_own_order() {
    let admin = TestClient::admin().await;
    let product = create_product(&admin, "9.00", 3).await;
    let customer = TestClient::customer().await;

    let placed = json_body(
        customer
            .post(
                "/api/orders",
                &json!({ "products": [{ "id": product, "quantity": 1 }] }),
            )
            .await,
    )
    .await;
    let order_id = placed["order"]["id"].as_i64().unwrap_or_default();

    let response = customer
        .patch(
            &format!("/api/orders/{order_id}"),
            &json!({ "status": "completed" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_order_history_is_newest_first() {
    let admin = TestClient::admin().await;
    let product = create_product(&admin, "5.00", 10).await;
    let customer = TestClient::customer().await;

    for _ in 0..2 {
        let response = customer
            .post(
                "/api/orders",
                &json!({ "products": [{ "id": product, "quantity": 1 }] }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let page = json_body(customer.get("/api/orders").await).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["current_page"], 1);
    let first = page["data"][0]["id"].as_i64().unwrap_or_default();
    let second = page["data"][1]["id"].as_i64().unwrap_or_default();
    assert!(first > second);
}
