//! Authentication and account management.
//!
//! [`manager::UserManager`] is the single entry point; it wraps the user
//! repository, the token service and the mailer, and converts their
//! low-level failures into the user-facing taxonomy below.

pub mod manager;
pub mod password;
pub mod tokens;

use coefin_core::PublicError;
use thiserror::Error;

use crate::db::DbError;
use crate::mail::MailError;

pub use manager::UserManager;
pub use tokens::{TokenPurpose, TokenService};

/// User-actionable account errors. Each maps to HTTP 400 with a
/// [`PublicError`] body carrying remediation hints.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserError {
    #[error("password is weak")]
    WeakPassword { improvements: Vec<String> },

    #[error("user already exists")]
    AlreadyExists,

    #[error("invalid credentials or status")]
    Authentication,

    #[error("email is not verified")]
    Unverified,

    #[error("invalid verification code or status")]
    Verification,

    #[error("email is already verified")]
    AlreadyVerified,

    #[error("invalid or expired reset code or status")]
    PasswordReset,
}

impl UserError {
    /// The body shown to the client, with remediation steps.
    pub fn to_public(&self) -> PublicError {
        match self {
            Self::WeakPassword { improvements } => {
                let ways = if improvements.is_empty() {
                    vec![
                        "Make up a more complex password.".to_owned(),
                        "Consider using a software-generated password.".to_owned(),
                    ]
                } else {
                    improvements.clone()
                };
                PublicError::new("Password is weak.", ways)
            }
            Self::AlreadyExists => PublicError::new(
                "User already exists.",
                [
                    "Make sure your email is valid and is not compromised, blocked or deleted."
                        .to_owned(),
                    "Try logging in.".to_owned(),
                ],
            ),
            Self::Authentication => PublicError::new(
                "Invalid credentials or status.",
                [
                    "Make sure your email and password are valid.".to_owned(),
                    "Make sure your account exists and is not deactivated.".to_owned(),
                ],
            ),
            Self::Unverified => {
                PublicError::new("Email is not verified.", ["Please, verify your email.".to_owned()])
            }
            Self::Verification => PublicError::new(
                "Invalid verification code or status.",
                [
                    "Make sure your inbox address and code are valid.".to_owned(),
                    "Make sure your account exists and is not deactivated.".to_owned(),
                ],
            ),
            Self::AlreadyVerified => PublicError::new(
                "Email is already verified.",
                [
                    "Make sure your email is valid.".to_owned(),
                    "Try logging in instead of verifying.".to_owned(),
                ],
            ),
            Self::PasswordReset => PublicError::new(
                "Invalid or expired reset code or status.",
                [
                    "Make sure your inbox address is valid.".to_owned(),
                    "Make sure your code is valid and is not expired.".to_owned(),
                    "Make sure your account exists and is not deactivated.".to_owned(),
                ],
            ),
        }
    }
}

/// Everything the manager can fail with.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("credential hashing failed: {0}")]
    Hash(String),
}
