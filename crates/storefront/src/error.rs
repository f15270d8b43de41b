//! Unified error handling with Sentry integration.
//!
//! Every route handler returns `Result<T, AppError>`. The response body is
//! always JSON: `{"message": "..."}`, plus `"errors": {field: [messages]}` for
//! validation failures. Server-side failures are captured to Sentry and their
//! details are never sent to the client.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use cornershop_core::order::OrderRequestError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::inventory::InventoryError;
use crate::services::orders::OrderError;

/// Per-field validation messages, serialized as `{field: [messages]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors with a single message for a single field.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] carrying these errors otherwise.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order placement or status change failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Request body failed validation.
    #[error("The given data was invalid.")]
    Validation(ValidationErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed to do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request is well-formed but cannot be applied to the current state.
    #[error("{0}")]
    Unprocessable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a ValidationErrors>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::PasswordMismatch
                | AuthError::MissingName => StatusCode::UNPROCESSABLE_ENTITY,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Order(err) => match err {
                OrderError::Request(_)
                | OrderError::Inventory(
                    InventoryError::InsufficientStock { .. }
                    | InventoryError::ProductNotFound(_)
                    | InventoryError::StockOverflow { .. },
                ) => StatusCode::UNPROCESSABLE_ENTITY,
                OrderError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                OrderError::NotOwner => StatusCode::FORBIDDEN,
                OrderError::NotPending => StatusCode::BAD_REQUEST,
                OrderError::Inventory(InventoryError::Repository(_)) | OrderError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Validation(_) | Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Server-side details are never included.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) | Self::Conflict(msg) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::PasswordMismatch => "Password confirmation does not match".to_string(),
                AuthError::MissingName => "Name is required".to_string(),
                AuthError::UserNotFound => "User not found".to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Internal server error".to_string()
                }
            },
            Self::Order(err) => match err {
                OrderError::Inventory(InventoryError::Repository(_)) | OrderError::Repository(_) => {
                    "Internal server error".to_string()
                }
                OrderError::NotOwner => "Unauthorized".to_string(),
                other => other.to_string(),
            },
            Self::Validation(_) => self.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Unprocessable(msg) => msg.clone(),
        }
    }

    /// Field errors to attach to the body, if any.
    fn field_errors(&self) -> Option<ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors.clone()),
            Self::Order(OrderError::Request(err)) => Some(ValidationErrors::single(
                "products",
                request_error_message(err),
            )),
            Self::Order(OrderError::Inventory(
                err @ (InventoryError::InsufficientStock { .. } | InventoryError::ProductNotFound(_)),
            )) => Some(ValidationErrors::single("products", err.to_string())),
            Self::Auth(AuthError::InvalidEmail(e)) => {
                Some(ValidationErrors::single("email", e.to_string()))
            }
            Self::Auth(AuthError::WeakPassword(msg)) => {
                Some(ValidationErrors::single("password", msg.clone()))
            }
            Self::Auth(AuthError::PasswordMismatch) => Some(ValidationErrors::single(
                "password",
                "The password confirmation does not match.",
            )),
            Self::Auth(AuthError::MissingName) => {
                Some(ValidationErrors::single("name", "The name field is required."))
            }
            _ => None,
        }
    }
}

fn request_error_message(err: &OrderRequestError) -> String {
    match err {
        OrderRequestError::Empty => "The products field must have at least 1 item.".to_string(),
        other => other.to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let errors = self.field_errors();
        let body = ErrorBody {
            message: self.public_message(),
            errors: errors.as_ref(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after authentication.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
