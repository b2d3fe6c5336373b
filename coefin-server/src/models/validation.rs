//! Validation error types for domain models.

use std::fmt;

/// Validation error carrying the offending field and the violated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// Field is shorter than the minimum length
    TooShort { field: &'static str, min: usize },

    /// String doesn't match the required format
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    /// Invalid enum variant
    InvalidVariant { field: &'static str, value: String },
}

impl ValidationError {
    /// The field this error belongs to, for per-field remediation entries.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty { field }
            | Self::TooLong { field, .. }
            | Self::TooShort { field, .. }
            | Self::InvalidFormat { field, .. }
            | Self::InvalidVariant { field, .. } => field,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} cannot be empty"),
            Self::TooLong { field, max } => {
                write!(f, "{field} exceeds maximum length of {max} characters")
            }
            Self::TooShort { field, min } => {
                write!(f, "{field} is shorter than {min} characters")
            }
            Self::InvalidFormat { field, reason } => write!(f, "{field}: {reason}"),
            Self::InvalidVariant { field, value } => {
                write!(f, "invalid {field} value: '{value}'")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
