//! Customer and admin login sessions.
//!
//! The session row holds the signed-in [`crate::models::CurrentUser`]; the
//! cookie only carries its id. Rows live in `tower_sessions.session`, which
//! `shop-cli migrate` creates.

use sqlx::PgPool;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "cornershop_session";

/// A shopper stays signed in for a week of inactivity.
const IDLE_EXPIRY: Duration = Duration::days(7);

/// Session layer over the storefront pool.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(PostgresStore::new(pool.clone()))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(IDLE_EXPIRY))
        .with_secure(serves_https(&config.base_url))
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Secure cookies only when the public URL is https; local http dev would
/// otherwise never get its cookie back.
fn serves_https(base_url: &str) -> bool {
    base_url
        .get(..8)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_cookie_follows_base_url_scheme() {
        assert!(serves_https("https://shop.example.com"));
        assert!(serves_https("HTTPS://shop.example.com"));
        assert!(!serves_https("http://localhost:3000"));
        assert!(!serves_https("https:"));
    }

    #[test]
    fn test_idle_expiry_is_a_week() {
        assert_eq!(IDLE_EXPIRY.whole_seconds(), 7 * 24 * 60 * 60);
    }
}
