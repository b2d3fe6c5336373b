//! coefin-server: versioned REST backend for company financial analytics
//!
//! Request flow: route handler resolves the shared [`http::server::AppState`],
//! delegates to a repo through the retrying [`db::Db`] wrapper, maps rows to
//! read schemas, wraps collections in offset or cursor pages, and funnels
//! every failure through [`http::error::ApiError`].

pub mod auth;
pub mod db;
pub mod external;
pub mod http;
pub mod mail;
pub mod models;

pub use http::error::ApiError;
pub use http::server::{run_server, AppState};
