//! Custom Axum extractors.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::server::AppState;
use crate::auth::TokenPurpose;
use crate::db::repos::{UserRepo, UserRow};

/// The caller behind a bearer access token. Resolving it hits the
/// database, so every authenticated route also sees a fresh
/// `is_active` flag.
pub struct AuthUser(pub UserRow);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthenticated)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated)?;

        let claims = state
            .tokens
            .check(TokenPurpose::Access, token)
            .map_err(|_| ApiError::Unauthenticated)?;

        let user = UserRepo::new(&state.db)
            .find_by_id(claims.uid)
            .await?
            .filter(|u| u.is_active && u.email == claims.email)
            .ok_or(ApiError::Unauthenticated)?;

        Ok(Self(user))
    }
}

/// Query extractor whose rejection keeps the deserializer's message, so
/// a bad `orderBy` or page number comes back as 422 naming the field.
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| ApiError::Malformed(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// JSON body extractor mapping parse failures to the 422 shape.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::Malformed(rejection.body_text()))?;
        Ok(Self(value))
    }
}
