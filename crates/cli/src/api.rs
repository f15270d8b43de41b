//! HTTP client for the storefront API.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use cornershop_core::ProductId;
use cornershop_core::cart::ProductSnapshot;
use cornershop_core::order::OrderRequest;

/// Errors talking to the storefront.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error body.
    #[error("{message} (HTTP {status})")]
    Rejected {
        status: StatusCode,
        message: String,
        errors: Option<Value>,
    },
}

/// `{"message": ..., "errors": ...}` error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    errors: Option<Value>,
}

/// `POST /api/orders` success body.
#[derive(Debug, Deserialize)]
pub struct PlacedOrder {
    pub message: String,
    pub order: Value,
}

/// Session-holding API client. Cookies persist for the client's lifetime.
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the storefront at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            http: Client::builder().cookie_store(true).build()?,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    /// Fetch a product to snapshot into the cart.
    pub async fn product(&self, id: ProductId) -> Result<ProductSnapshot, ApiError> {
        let response = self.http.get(self.url(&format!("/products/{id}"))).send().await?;
        decode(response).await
    }

    /// Log in; the session cookie is kept for later calls.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        decode::<Value>(response).await.map(|_| ())
    }

    /// Place an order for the given lines.
    pub async fn place_order(&self, request: &OrderRequest) -> Result<PlacedOrder, ApiError> {
        let response = self
            .http
            .post(self.url("/orders"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await?;
    let (message, errors) = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => (parsed.message, parsed.errors),
        Err(_) => (body, None),
    };
    Err(ApiError::Rejected {
        status,
        message,
        errors,
    })
}
