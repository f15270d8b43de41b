//! Account routes: register, login, logout, current user.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::ApiJson;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Registration form.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Login form.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user))
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create a customer account and log it in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(form): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = AuthService::new(state.pool())
        .register(
            &form.name,
            &form.email,
            &form.password,
            &form.password_confirmation,
        )
        .await?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// Log in with email and password.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(form): ApiJson<LoginRequest>,
) -> Result<Json<UserResponse>> {
    let user = match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            return Err(e.into());
        }
    };

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(UserResponse { user }))
}

/// End the session.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn logout(
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<MessageResponse>> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();

    Ok(Json(MessageResponse {
        message: "Logged out successfully",
    }))
}

/// The logged-in user, read fresh from the database.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.pool()).get_user(user.id).await?;
    Ok(Json(UserResponse { user }))
}
