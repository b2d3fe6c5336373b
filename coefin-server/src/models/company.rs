//! Company schemas and validated identifiers.
//!
//! A company is identified naturally by its business registration number
//! (BRN) together with its country; the pair is unique.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::analytics::AnalyticsRead;
use super::user::UserRead;
use super::validation::ValidationError;

const MAX_BRN_LEN: usize = 100;
const MAX_NAME_LEN: usize = 300;

/// ISO 3166-1 alpha-2 code, uppercase.
static COUNTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}$").expect("invalid country regex"));

/// Business registration number: the identifier a government assigns to a
/// company. Non-empty, at most 100 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Brn(String);

impl Brn {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "brn" });
        }
        if s.len() > MAX_BRN_LEN {
            return Err(ValidationError::TooLong {
                field: "brn",
                max: MAX_BRN_LEN,
            });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Company display name. Non-empty, at most 300 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyName(String);

impl CompanyName {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        if s.len() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field: "name",
                max: MAX_NAME_LEN,
            });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Two-letter uppercase country code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "country" });
        }
        if !COUNTRY_RE.is_match(s) {
            return Err(ValidationError::InvalidFormat {
                field: "country",
                reason: "must be a two-letter uppercase ISO 3166-1 code",
            });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Write shape for inserting a company.
#[derive(Debug, Clone)]
pub struct CompanyCreate {
    pub name: CompanyName,
    pub brn: Brn,
    pub country: CountryCode,
}

/// Natural-key lookup: BRN + country.
#[derive(Debug, Clone)]
pub struct CompanySearch {
    pub brn: Brn,
    pub country: CountryCode,
}

/// Read shape returned by the API. Relationships are always fully loaded
/// before a value of this type is built; no lazy fields escape the DB layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRead {
    pub name: String,
    pub brn: String,
    pub country: String,
    pub score: Option<Decimal>,
    pub created_at: DateTime<Utc>,

    pub analytics: Vec<AnalyticsRead>,
    pub users: Vec<UserRead>,
}
