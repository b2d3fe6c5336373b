//! Axum server setup.
//!
//! Exact-origin CORS (localhost defaults), request tracing, a global
//! timeout, gzip compression and graceful shutdown on SIGTERM/Ctrl+C.

use std::sync::Arc;

use axum::http::{HeaderValue, StatusCode};
use axum::Router;
use coefin_core::settings::{AuthSettings, ServerSettings};
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::auth::{TokenService, UserManager};
use crate::db::Db;
use crate::external::RestClient;
use crate::mail::Mailer;

/// Shared application state.
pub struct AppState {
    pub db: Db,
    pub tokens: TokenService,
    pub mailer: Arc<dyn Mailer>,
    pub external: RestClient,
}

impl AppState {
    pub fn new(
        db: Db,
        auth: &AuthSettings,
        mailer: Arc<dyn Mailer>,
        external: RestClient,
    ) -> Self {
        Self {
            db,
            tokens: TokenService::new(auth),
            mailer,
            external,
        }
    }

    /// Per-request account facade.
    pub fn users(&self) -> UserManager<'_> {
        UserManager::new(&self.db, &self.tokens, self.mailer.as_ref())
    }
}

fn cors(settings: &ServerSettings) -> CorsLayer {
    let origins: Vec<HeaderValue> = if settings.allowed_origins.is_empty() {
        [
            "http://localhost:3000",
            "http://localhost:8000",
            "http://127.0.0.1:3000",
            "http://127.0.0.1:8000",
        ]
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect()
    } else {
        settings
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect()
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Assemble the full application router.
pub fn build_router(state: Arc<AppState>, settings: &ServerSettings) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::users::router())
        .merge(routes::companies::router())
        .layer(cors(settings))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            settings.request_timeout,
        ))
        .layer(CompressionLayer::new())
        .with_state(state)
}

/// Run the HTTP server until a shutdown signal arrives.
pub async fn run_server(state: Arc<AppState>, settings: &ServerSettings) -> std::io::Result<()> {
    let app = build_router(state, settings);

    let addr = format!("{}:{}", settings.bind, settings.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, starting shutdown");
        }
    }
}
