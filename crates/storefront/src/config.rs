//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the API
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SHOP_TAX_RATE` - Tax rate as a fraction of the subtotal (default: 0.10)
//! - `SHOP_SHIPPING_FLAT_RATE` - Flat shipping fee per order (default: 5.00)
//! - `PRODUCT_CACHE_TTL_SECS` - Product listing cache lifetime (default: 300)
//! - `MAIL_ADMIN_ADDRESS` - Recipient of new-order notifications (default: admin@example.com)
//! - `SMTP_HOST` - Enables email delivery when set; together with:
//!   - `SMTP_PORT` (default: 587)
//!   - `SMTP_USERNAME`
//!   - `SMTP_PASSWORD`
//!   - `MAIL_FROM_ADDRESS`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sentry sampling (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use cornershop_core::ShopRates;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_ADMIN_ADDRESS: &str = "admin@example.com";
const DEFAULT_PRODUCT_CACHE_TTL_SECS: u64 = 300;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Tax rate and flat shipping fee
    pub rates: ShopRates,
    /// Lifetime of cached product listing pages
    pub product_cache_ttl: Duration,
    /// Notification mail settings
    pub mail: MailConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Order notification settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Address that receives a copy of every order notification
    pub admin_address: String,
    /// SMTP delivery; `None` logs notifications instead of sending them
    pub smtp: Option<SmtpConfig>,
}

/// SMTP transport configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let rates = rates_from_env()?;
        let product_cache_ttl = get_env_or_default(
            "PRODUCT_CACHE_TTL_SECS",
            &DEFAULT_PRODUCT_CACHE_TTL_SECS.to_string(),
        )
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| {
            ConfigError::InvalidEnvVar("PRODUCT_CACHE_TTL_SECS".to_string(), e.to_string())
        })?;
        let mail = MailConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            rates,
            product_cache_ttl,
            mail,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl MailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            admin_address: get_env_or_default("MAIL_ADMIN_ADDRESS", DEFAULT_ADMIN_ADDRESS),
            smtp: SmtpConfig::from_env()?,
        })
    }
}

impl SmtpConfig {
    /// Returns `None` when `SMTP_HOST` is unset (email delivery disabled).
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        let port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            host,
            port,
            username: get_required_env("SMTP_USERNAME")?,
            password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("MAIL_FROM_ADDRESS")?,
        }))
    }
}

fn rates_from_env() -> Result<ShopRates, ConfigError> {
    let tax_rate = match get_optional_env("SHOP_TAX_RATE") {
        Some(raw) => parse_tax_rate("SHOP_TAX_RATE", &raw)?,
        None => ShopRates::DEFAULT_TAX_RATE,
    };
    let shipping_flat_rate = match get_optional_env("SHOP_SHIPPING_FLAT_RATE") {
        Some(raw) => parse_amount("SHOP_SHIPPING_FLAT_RATE", &raw)?,
        None => ShopRates::DEFAULT_SHIPPING_FLAT_RATE,
    };

    Ok(ShopRates::new(tax_rate, shipping_flat_rate))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a non-negative decimal amount.
fn parse_amount(key: &str, raw: &str) -> Result<Decimal, ConfigError> {
    let value = Decimal::from_str(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if value.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(value)
}

/// Parse a tax rate: a fraction between 0 and 1 inclusive.
fn parse_tax_rate(key: &str, raw: &str) -> Result<Decimal, ConfigError> {
    let value = parse_amount(key, raw)?;
    if value > Decimal::ONE {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be a fraction between 0 and 1 (got {value})"),
        ));
    }
    Ok(value)
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-session-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_parse_tax_rate() {
        assert_eq!(parse_tax_rate("T", "0.0825").unwrap(), dec("0.0825"));
        assert_eq!(parse_tax_rate("T", " 0 ").unwrap(), Decimal::ZERO);
        assert!(parse_tax_rate("T", "1.5").is_err());
        assert!(parse_tax_rate("T", "-0.1").is_err());
        assert!(parse_tax_rate("T", "ten percent").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("S", "7.49").unwrap(), dec("7.49"));
        assert!(parse_amount("S", "-1").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            rates: ShopRates::default(),
            product_cache_ttl: Duration::from_secs(300),
            mail: MailConfig {
                admin_address: DEFAULT_ADMIN_ADDRESS.to_string(),
                smtp: None,
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_smtp_config_debug_redacts_password() {
        let config = SmtpConfig {
            host: "smtp.mailhost.test".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: SecretString::from("super_secret_smtp_password"),
            from_address: "orders@shop.test".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.mailhost.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }
}
