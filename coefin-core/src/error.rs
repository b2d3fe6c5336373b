//! Public error payload returned to API clients.
//!
//! Only "detailed" errors carry a body; system-internal failures answer with
//! a bare status code so nothing about the infrastructure leaks out.

use serde::{Deserialize, Serialize};

/// Maximum number of remediation entries in a single payload.
const MAX_WAYS_TO_SOLVE: usize = 5;

/// User-facing error body: a reason plus 1..=5 concrete remediation steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicError {
    pub reason: String,
    pub ways_to_solve: Vec<String>,
}

impl PublicError {
    /// Build a payload, truncating remediation steps to the allowed maximum
    /// and falling back to a generic hint when none were supplied.
    pub fn new(reason: impl Into<String>, ways_to_solve: impl IntoIterator<Item = String>) -> Self {
        let mut ways: Vec<String> = ways_to_solve
            .into_iter()
            .filter(|way| !way.is_empty())
            .take(MAX_WAYS_TO_SOLVE)
            .collect();

        if ways.is_empty() {
            ways.push("Try later.".to_owned());
        }

        Self {
            reason: reason.into(),
            ways_to_solve: ways,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let err = PublicError::new("Password is weak.", ["Make up a more complex password.".to_owned()]);
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["reason"], "Password is weak.");
        assert_eq!(json["waysToSolve"][0], "Make up a more complex password.");
    }

    #[test]
    fn truncates_to_five_entries() {
        let ways = (0..8).map(|i| format!("step {i}"));
        let err = PublicError::new("oops", ways);

        assert_eq!(err.ways_to_solve.len(), 5);
    }

    #[test]
    fn empty_ways_get_fallback() {
        let err = PublicError::new("oops", []);

        assert_eq!(err.ways_to_solve, vec!["Try later.".to_owned()]);
    }
}
