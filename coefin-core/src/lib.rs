//! coefin-core: shared building blocks for the coefin backend
//!
//! Holds the environment-backed settings structs, the public error payload
//! returned by the HTTP layer, and the password strength policy. Everything
//! here is independent of axum and sqlx so it can be unit tested without a
//! running server or database.

pub mod error;
pub mod password;
pub mod settings;

pub use error::PublicError;
pub use password::{PasswordPolicy, StrengthReport};
pub use settings::{
    AuthSettings, DbCredentials, DbSettings, ExternalApiSettings, MailSettings, ServerSettings,
    SettingsError,
};
