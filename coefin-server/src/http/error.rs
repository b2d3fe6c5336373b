//! API error type with IntoResponse.
//!
//! The status matrix:
//! - validation failures are 422 with per-field remediation hints
//! - user-actionable account errors are 400 with a [`PublicError`] body
//! - mail and external-provider outages are 503 with a body
//! - database failures are 500 with an EMPTY body (nothing internal leaks)
//! - 404 and 401 are empty as well

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use coefin_core::PublicError;

use crate::auth::{AuthError, UserError};
use crate::db::DbError;
use crate::external::ExternalApiError;
use crate::mail::MailError;
use crate::models::ValidationError;

#[derive(Debug)]
pub enum ApiError {
    /// One entry per invalid field (422).
    Validation(Vec<ValidationError>),

    /// Request body or query string did not deserialize (422).
    Malformed(String),

    /// Resource lookup missed (404, empty body).
    NotFound,

    /// Missing or bad credentials (401, empty body).
    Unauthenticated,

    /// Write collided with an existing record (409).
    Conflict(PublicError),

    /// Account-level error the user can act on (400).
    User(UserError),

    /// Database failure (500, empty body, logged).
    Db(DbError),

    /// Mail delivery failure (503).
    Mail(MailError),

    /// Upstream provider failure (503).
    ExternalApi(ExternalApiError),

    /// Anything else (500, empty body, logged).
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => {
                tracing::debug!(count = errors.len(), "request failed validation");
                let ways = errors.iter().map(ToString::to_string).collect::<Vec<_>>();
                let body = PublicError::new("Invalid input.", ways);
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
            Self::Malformed(message) => {
                tracing::debug!(%message, "request could not be parsed");
                let body = PublicError::new("Invalid input.", [message]);
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Unauthenticated => StatusCode::UNAUTHORIZED.into_response(),
            Self::Conflict(body) => {
                tracing::debug!("write conflicted with an existing record");
                (StatusCode::CONFLICT, Json(body)).into_response()
            }
            Self::User(err) => {
                tracing::debug!(error = %err, "user-actionable error");
                (StatusCode::BAD_REQUEST, Json(err.to_public())).into_response()
            }
            Self::Db(err) => {
                match &err {
                    DbError::Connection { .. } => {
                        tracing::error!(error = %err, "database is unreachable")
                    }
                    DbError::Response { .. } => {
                        tracing::error!(error = %err, "database rejected a query")
                    }
                }
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Mail(err) => {
                tracing::error!(error = %err, "mail delivery failed");
                (StatusCode::SERVICE_UNAVAILABLE, Json(err.to_public())).into_response()
            }
            Self::ExternalApi(err) => {
                tracing::error!(error = %err, "external provider failed");
                (StatusCode::SERVICE_UNAVAILABLE, Json(err.to_public())).into_response()
            }
            Self::Internal(message) => {
                tracing::error!(%message, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(vec![e])
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        Self::Db(e)
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        Self::User(e)
    }
}

impl From<MailError> for ApiError {
    fn from(e: MailError) -> Self {
        Self::Mail(e)
    }
}

impl From<ExternalApiError> for ApiError {
    fn from(e: ExternalApiError) -> Self {
        Self::ExternalApi(e)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::User(err) => Self::User(err),
            AuthError::Db(err) => Self::Db(err),
            AuthError::Mail(err) => Self::Mail(err),
            AuthError::Hash(message) => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read failed")
            .to_vec()
    }

    #[tokio::test]
    async fn validation_is_422_with_per_field_hints() {
        let err = ApiError::Validation(vec![
            ValidationError::Empty { field: "name" },
            ValidationError::TooLong {
                field: "brn",
                max: 100,
            },
        ]);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: serde_json::Value =
            serde_json::from_slice(&body_of(response).await).expect("invalid json");
        assert_eq!(body["reason"], "Invalid input.");
        assert_eq!(body["waysToSolve"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn database_errors_are_500_with_empty_body() {
        let err = ApiError::Db(DbError::Connection {
            code: Some("57P01".into()),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn unauthenticated_is_401_with_empty_body() {
        let response = ApiError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn not_found_is_404_with_empty_body() {
        let response = ApiError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn user_errors_are_400_with_remediation() {
        let response = ApiError::User(UserError::Unverified).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value =
            serde_json::from_slice(&body_of(response).await).expect("invalid json");
        assert_eq!(body["reason"], "Email is not verified.");
    }

    #[tokio::test]
    async fn mail_outage_is_503_with_body() {
        let response =
            ApiError::Mail(MailError::Connection("connection refused".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value =
            serde_json::from_slice(&body_of(response).await).expect("invalid json");
        assert_eq!(body["reason"], "Mail service is unavailable.");
    }
}
