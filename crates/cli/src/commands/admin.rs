//! Admin user management commands.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string

use cornershop_core::{UserId, UserRole};
use cornershop_storefront::services::auth::{AuthError, AuthService};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// User already exists.
    #[error("A user already exists with email: {0}. Use `admin promote` instead.")]
    UserExists(String),

    /// No account to promote.
    #[error("No user with email: {0}")]
    UserNotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a new admin user.
///
/// # Returns
///
/// The ID of the created admin user.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, AdminError> {
    let pool = connect().await?;

    tracing::info!("Creating admin user: {}", email);
    let user = AuthService::new(&pool)
        .create_user(name, email, password, UserRole::Admin)
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => AdminError::UserExists(email.to_owned()),
            other => AdminError::Auth(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id)
}

/// Grant admin rights to an existing account.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let pool = connect().await?;

    let user = AuthService::new(&pool)
        .set_role(email, UserRole::Admin)
        .await
        .map_err(|e| match e {
            AuthError::UserNotFound => AdminError::UserNotFound(email.to_owned()),
            other => AdminError::Auth(other),
        })?;

    tracing::info!("{} ({}) is now an admin", user.email, user.id);
    Ok(())
}
