//! Analytics and ratio read schemas.
//!
//! Analytics belong to exactly one company and own their ratios; both are
//! cascade-deleted with the parent. Name bounds mirror the DB constraints
//! (analytics 30 chars, ratio 20 chars, both non-empty).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const MAX_ANALYTICS_NAME_LEN: usize = 30;
pub const MAX_RATIO_NAME_LEN: usize = 20;

/// Direction in which a ratio deviates from its reference band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deviation {
    Lower,
    Upper,
}

impl Deviation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lower => "Lower",
            Self::Upper => "Upper",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Lower" => Some(Self::Lower),
            "Upper" => Some(Self::Upper),
            _ => None,
        }
    }
}

/// A single financial ratio inside an analytical report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatioRead {
    pub name: String,
    pub value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviation: Option<Deviation>,
}

/// An analytical report with its ratios, returned inline with company reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRead {
    pub name: String,
    pub ratios: Vec<RatioRead>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn deviation_round_trips_as_db_text() {
        assert_eq!(Deviation::parse("Lower"), Some(Deviation::Lower));
        assert_eq!(Deviation::parse("Upper"), Some(Deviation::Upper));
        assert_eq!(Deviation::parse("Sideways"), None);
        assert_eq!(Deviation::Upper.as_str(), "Upper");
    }

    #[test]
    fn ratio_omits_null_deviation() {
        let ratio = RatioRead {
            name: "ROE".into(),
            value: dec!(12.5),
            deviation: None,
        };
        let json = serde_json::to_value(&ratio).unwrap();

        assert!(json.get("deviation").is_none());
    }
}
