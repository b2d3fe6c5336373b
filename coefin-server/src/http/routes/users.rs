//! Account endpoints: registration, login, email verification, password
//! reset and the authenticated profile.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidJson};
use crate::http::server::AppState;
use crate::models::{EmailAddress, Nickname, UserRead, ValidationError};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub nickname: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// OAuth2-shaped token response, so standard clients can consume it.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/v1/users/auth/register
async fn register(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserRead>), ApiError> {
    let mut errors = Vec::new();
    let nickname = Nickname::new(&req.nickname).map_err(|e| errors.push(e)).ok();
    let email = EmailAddress::new(&req.email).map_err(|e| errors.push(e)).ok();
    let (Some(nickname), Some(email)) = (nickname, email) else {
        return Err(ApiError::Validation(errors));
    };

    let created = state
        .users()
        .register(&nickname, &email, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/v1/users/auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let access_token = state.users().authenticate(&req.email, &req.password).await?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

/// POST /api/v1/users/auth/request-verify-token
async fn request_verify(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<EmailRequest>,
) -> Result<StatusCode, ApiError> {
    state.users().request_verify(&req.email).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/v1/users/auth/verify
async fn verify(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<VerifyRequest>,
) -> Result<Json<UserRead>, ApiError> {
    let verified = state.users().verify(&req.token).await?;
    Ok(Json(verified))
}

/// POST /api/v1/users/auth/forgot-password
async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<EmailRequest>,
) -> Result<StatusCode, ApiError> {
    state.users().forgot_password(&req.email).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/v1/users/auth/reset-password
async fn reset_password(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ResetRequest>,
) -> Result<StatusCode, ApiError> {
    state.users().reset_password(&req.token, &req.password).await?;
    Ok(StatusCode::OK)
}

/// GET /api/v1/users/me
async fn me(AuthUser(user): AuthUser) -> Json<UserRead> {
    Json(user.to_read())
}

/// PATCH /api/v1/users/me
async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ProfileUpdateRequest>,
) -> Result<Json<UserRead>, ApiError> {
    let mut errors: Vec<ValidationError> = Vec::new();
    let nickname = match req.nickname.as_deref() {
        Some(raw) => Nickname::new(raw).map_err(|e| errors.push(e)).ok(),
        None => None,
    };
    let email = match req.email.as_deref() {
        Some(raw) => EmailAddress::new(raw).map_err(|e| errors.push(e)).ok(),
        None => None,
    };
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let updated = state
        .users()
        .update_profile(&user, nickname.as_ref(), email.as_ref(), req.password.as_deref())
        .await?;
    Ok(Json(updated))
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/users/auth/register", post(register))
        .route("/api/v1/users/auth/login", post(login))
        .route("/api/v1/users/auth/request-verify-token", post(request_verify))
        .route("/api/v1/users/auth/verify", post(verify))
        .route("/api/v1/users/auth/forgot-password", post(forgot_password))
        .route("/api/v1/users/auth/reset-password", post(reset_password))
        .route("/api/v1/users/me", get(me).patch(update_me))
}
