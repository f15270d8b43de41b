//! Account errors for registration, login and role changes.

use thiserror::Error;

use crate::db::RepositoryError;

/// Why an account operation was refused.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] cornershop_core::EmailError),

    /// Unknown email or wrong password. The two are not told apart.
    #[error("email or password is incorrect")]
    InvalidCredentials,

    /// No account for the given id or email (admin tooling only).
    #[error("no such account")]
    UserNotFound,

    /// Registration with an email that already has an account.
    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// Password shorter than the minimum; carries the shopper-facing message.
    #[error("password rejected: {0}")]
    WeakPassword(String),

    #[error("password confirmation does not match")]
    PasswordMismatch,

    #[error("name is required")]
    MissingName,

    #[error("account storage error: {0}")]
    Repository(#[from] RepositoryError),

    /// Argon2 failed to produce a hash.
    #[error("could not hash password")]
    PasswordHash,
}
