//! Subcommand implementations.

pub mod admin;
pub mod cart;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

/// Error opening the storefront database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Missing environment variable: {0} (or DATABASE_URL)")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the storefront database named by `STOREFRONT_DATABASE_URL`,
/// falling back to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, ConnectError> {
    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(cornershop_storefront::db::create_pool(&database_url).await?)
}
