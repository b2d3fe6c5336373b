//! Password strength policy.
//!
//! Scores candidate passwords 0..=4 and rejects anything below the required
//! score. The caller passes the user's own identifiers (nickname, email) so
//! they count as disallowed substrings.

use zxcvbn::{zxcvbn, Score};

/// Minimum acceptable score on the 0..=4 scale.
const REQUIRED_SCORE: Score = Score::Three;

/// Human-readable labels for each score band.
const STRENGTH: [&str; 5] = ["Very Weak", "Weak", "Medium", "Strong", "Very Strong"];

/// Outcome of a strength check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthReport {
    pub is_strong: bool,
    pub score: u8,
    pub strength: &'static str,
    pub improvements: Vec<String>,
}

/// Stateless strength validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordPolicy;

impl PasswordPolicy {
    /// Score a password, treating `related` inputs (nickname, email) as
    /// known-weak material.
    pub fn validate(&self, password: &str, related: &[&str]) -> StrengthReport {
        let entropy = zxcvbn(password, related);
        let score = entropy.score();

        let index = match score {
            Score::Zero => 0,
            Score::One => 1,
            Score::Two => 2,
            Score::Three => 3,
            _ => 4,
        };

        let improvements = entropy
            .feedback()
            .map(|feedback| {
                feedback
                    .suggestions()
                    .iter()
                    .map(|suggestion| suggestion.to_string())
                    .collect()
            })
            .unwrap_or_default();

        StrengthReport {
            is_strong: score >= REQUIRED_SCORE,
            score: index as u8,
            strength: STRENGTH[index],
            improvements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_trivial_password() {
        let report = PasswordPolicy.validate("password123", &[]);

        assert!(!report.is_strong);
        assert!(report.score < 3);
    }

    #[test]
    fn weak_passwords_come_with_suggestions() {
        let report = PasswordPolicy.validate("password123", &["password123user"]);

        assert!(!report.is_strong);
        assert!(!report.improvements.is_empty());
    }

    #[test]
    fn related_inputs_weaken_the_score() {
        let nickname = "krakozyabra42";
        let alone = PasswordPolicy.validate(nickname, &[]);
        let related = PasswordPolicy.validate(nickname, &[nickname]);

        assert!(related.score <= alone.score);
        assert!(!related.is_strong);
    }

    #[test]
    fn accepts_generated_password() {
        let report = PasswordPolicy.validate("-¯#P'Hä¯Nðfº2>+¶;Öðº±í", &[]);

        assert!(report.is_strong);
        assert_eq!(report.strength, STRENGTH[report.score as usize]);
    }
}
