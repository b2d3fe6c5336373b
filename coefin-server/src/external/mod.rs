//! Client for the upstream company-data provider.
//!
//! Thin JSON-over-HTTP client with bearer auth. Transport-level failures
//! retry up to the configured budget; error statuses from the provider
//! are reported immediately. Both map to 503 at our HTTP boundary.

use coefin_core::settings::ExternalApiSettings;
use coefin_core::PublicError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExternalApiError {
    #[error("external service is unreachable: {0}")]
    Connection(String),

    #[error("external service returned {status}")]
    Response {
        status: u16,
        body: serde_json::Value,
    },
}

impl ExternalApiError {
    pub fn to_public(&self) -> PublicError {
        PublicError::new(
            "External service is unavailable.",
            [
                "Try later.".to_owned(),
                "Contact with Support.".to_owned(),
            ],
        )
    }
}

/// Bearer-authenticated JSON client with a transport retry budget.
pub struct RestClient {
    http: reqwest::Client,
    token: String,
    retries: u32,
}

impl RestClient {
    pub fn new(settings: &ExternalApiSettings) -> Result<Self, ExternalApiError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ExternalApiError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            token: settings.token.clone(),
            retries: settings.retries,
        })
    }

    /// GET a JSON document. Non-success statuses carry the provider's
    /// body through for logging.
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, ExternalApiError> {
        let attempts = self.retries.max(1);
        let mut last = String::new();

        for attempt in 1..=attempts {
            let response = match self
                .http
                .get(url)
                .bearer_auth(&self.token)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "external request failed, retrying");
                    last = err.to_string();
                    continue;
                }
            };

            let status = response.status();
            let body = response
                .json::<serde_json::Value>()
                .await
                .unwrap_or(serde_json::Value::Null);

            if status.is_success() {
                return Ok(body);
            }
            return Err(ExternalApiError::Response {
                status: status.as_u16(),
                body,
            });
        }

        Err(ExternalApiError::Connection(last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::time::Duration;

    fn settings() -> ExternalApiSettings {
        ExternalApiSettings {
            token: "provider-token".into(),
            timeout: Duration::from_secs(1),
            retries: 2,
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind failed");
        let addr = listener.local_addr().expect("no local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve failed");
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn success_returns_parsed_body() {
        let base = serve(Router::new().route(
            "/company",
            get(|| async { Json(serde_json::json!({"brn": "5077746887312"})) }),
        ))
        .await;

        let client = RestClient::new(&settings()).expect("client construction failed");
        let body = client
            .get_json(&format!("{base}/company"))
            .await
            .expect("request failed");
        assert_eq!(body["brn"], "5077746887312");
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let base = serve(Router::new().route(
            "/company",
            get(|| async {
                (
                    StatusCode::BAD_GATEWAY,
                    Json(serde_json::json!({"detail": "upstream down"})),
                )
            }),
        ))
        .await;

        let client = RestClient::new(&settings()).expect("client construction failed");
        let err = client
            .get_json(&format!("{base}/company"))
            .await
            .expect_err("error status must fail");

        match err {
            ExternalApiError::Response { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body["detail"], "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn refused_connection_exhausts_retries() {
        // Bind and drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind failed");
        let addr = listener.local_addr().expect("no local addr");
        drop(listener);

        let client = RestClient::new(&settings()).expect("client construction failed");
        let err = client
            .get_json(&format!("http://{addr}/company"))
            .await
            .expect_err("refused connection must fail");
        assert!(matches!(err, ExternalApiError::Connection(_)));
    }
}
