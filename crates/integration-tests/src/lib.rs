//! Integration tests for Cornershop.
//!
//! # Running Tests
//!
//! ```bash
//! shop-cli migrate && shop-cli seed
//! cargo run -p cornershop-storefront &
//! cargo test -p cornershop-integration-tests -- --ignored
//! ```
//!
//! `STOREFRONT_BASE_URL` points the tests at another server. The seeded
//! accounts (`test@example.com`, `admin@example.com`) must exist.
//!
//! Each test registers its own customer and creates its own products, so the
//! tests can run against a shared database in any order.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "adminpassword";

/// Base URL for the storefront (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A cookie-holding client bound to the storefront.
pub struct TestClient {
    pub http: Client,
    base_url: String,
}

impl TestClient {
    /// An anonymous client.
    ///
    /// Each client claims its own forwarded address, so the login rate limit
    /// applies per test rather than to the whole run.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn anonymous() -> Self {
        let [a, b, c, ..] = Uuid::new_v4().into_bytes();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_str(&format!("10.{a}.{b}.{c}")).expect("valid header value"),
        );

        Self {
            http: Client::builder()
                .cookie_store(true)
                .default_headers(headers)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url(),
        }
    }

    /// A freshly registered customer, logged in.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub async fn customer() -> Self {
        let client = Self::anonymous();
        let email = format!("customer-{}@example.com", Uuid::new_v4());
        let response = client
            .post(
                "/api/register",
                &json!({
                    "name": "Integration Customer",
                    "email": email,
                    "password": "integration-password",
                    "password_confirmation": "integration-password",
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "registration failed");
        client
    }

    /// The seeded admin, logged in.
    ///
    /// # Panics
    ///
    /// Panics if login fails.
    pub async fn admin() -> Self {
        let client = Self::anonymous();
        let response = client
            .post(
                "/api/login",
                &json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "admin login failed");
        client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.http
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn put(&self, path: &str, body: &Value) -> Response {
        self.http
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn patch(&self, path: &str, body: &Value) -> Response {
        self.http
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PATCH failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn delete(&self, path: &str) -> Response {
        self.http
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE failed")
    }
}

/// Read a JSON body.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json_body(response: Response) -> Value {
    response.json().await.expect("Response body is not JSON")
}

/// Create a product as admin and return its id.
///
/// # Panics
///
/// Panics if the product cannot be created.
pub async fn create_product(admin: &TestClient, price: &str, stock: i64) -> i64 {
    let response = admin
        .post(
            "/api/admin/products",
            &json!({
                "name": format!("Integration Product {}", Uuid::new_v4()),
                "price": price,
                "stock_quantity": stock,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED, "product create failed");
    json_body(response).await["id"]
        .as_i64()
        .expect("product id missing")
}

/// Current stock of a product.
///
/// # Panics
///
/// Panics if the product cannot be fetched.
pub async fn stock_of(client: &TestClient, product_id: i64) -> i64 {
    let response = client.get(&format!("/api/products/{product_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["stock_quantity"]
        .as_i64()
        .expect("stock_quantity missing")
}
