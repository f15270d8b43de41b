//! Request body and query extractors that reject with [`AppError`], so every
//! malformed request gets the same JSON error shape as a failed validation.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;

use crate::error::AppError;

/// `axum::Json` with JSON error bodies.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` with JSON error bodies.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `axum::extract::Path` where an unparsable id is a 404, like an unknown one.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::UNPROCESSABLE_ENTITY {
            Self::Unprocessable(rejection.body_text())
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Unparsable path parameter");
        Self::NotFound("Not found".to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, routing::post};
    use serde::Deserialize;
    use tower::ServiceExt;

    use super::*;

    #[derive(Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    async fn handler(ApiJson(_): ApiJson<Payload>) -> &'static str {
        "ok"
    }

    async fn send(body: &'static str) -> StatusCode {
        let app = Router::new().route("/", post(handler));
        app.oneshot(
            Request::post("/")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn test_missing_field_is_unprocessable() {
        assert_eq!(send("{}").await, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_syntax_error_is_bad_request() {
        assert_eq!(send("{").await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_valid_body() {
        assert_eq!(send(r#"{"name":"x"}"#).await, StatusCode::OK);
    }
}
