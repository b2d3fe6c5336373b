//! Signed JWTs for access, email verification and password reset.
//!
//! Each purpose gets its own secret so a leaked verification code can
//! never be replayed as an access token.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use coefin_core::settings::AuthSettings;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is invalid or expired")]
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Access,
    Verify,
    Reset,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub uid: i64,
    pub email: String,
    pub purpose: TokenPurpose,
    pub exp: u64,
}

/// Issues and checks tokens against the per-purpose secrets.
#[derive(Clone)]
pub struct TokenService {
    access: String,
    verify: String,
    reset: String,
    access_ttl: Duration,
    action_ttl: Duration,
}

impl TokenService {
    pub fn new(settings: &AuthSettings) -> Self {
        Self {
            access: settings.access_secret.clone(),
            verify: settings.email_verification_secret.clone(),
            reset: settings.password_reset_secret.clone(),
            access_ttl: settings.access_ttl,
            action_ttl: settings.action_token_ttl,
        }
    }

    fn secret(&self, purpose: TokenPurpose) -> &[u8] {
        match purpose {
            TokenPurpose::Access => self.access.as_bytes(),
            TokenPurpose::Verify => self.verify.as_bytes(),
            TokenPurpose::Reset => self.reset.as_bytes(),
        }
    }

    fn ttl(&self, purpose: TokenPurpose) -> Duration {
        match purpose {
            TokenPurpose::Access => self.access_ttl,
            TokenPurpose::Verify | TokenPurpose::Reset => self.action_ttl,
        }
    }

    pub fn issue(
        &self,
        purpose: TokenPurpose,
        uid: i64,
        email: &str,
    ) -> Result<String, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::Invalid)?;
        let claims = Claims {
            uid,
            email: email.to_owned(),
            purpose,
            exp: (now + self.ttl(purpose)).as_secs(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret(purpose)),
        )
        .map_err(|_| TokenError::Invalid)
    }

    /// Decode a token, enforcing both the signature for `purpose` and the
    /// purpose claim baked into the token itself.
    pub fn check(&self, purpose: TokenPurpose, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(purpose)),
            &validation,
        )
        .map_err(|_| TokenError::Invalid)?;

        if data.claims.purpose != purpose {
            return Err(TokenError::Invalid);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&AuthSettings {
            access_secret: "access-secret".into(),
            email_verification_secret: "verify-secret".into(),
            password_reset_secret: "reset-secret".into(),
            sys_email: "noreply@coefin.dev".into(),
            access_ttl: Duration::from_secs(3600),
            action_token_ttl: Duration::from_secs(3600),
        })
    }

    #[test]
    fn issue_and_check_round_trip() {
        let tokens = service();
        let raw = tokens
            .issue(TokenPurpose::Access, 7, "ivanov@mail.ru")
            .expect("issue failed");

        let claims = tokens
            .check(TokenPurpose::Access, &raw)
            .expect("check failed");
        assert_eq!(claims.uid, 7);
        assert_eq!(claims.email, "ivanov@mail.ru");
    }

    #[test]
    fn purposes_are_not_interchangeable() {
        let tokens = service();
        let raw = tokens
            .issue(TokenPurpose::Verify, 7, "ivanov@mail.ru")
            .expect("issue failed");

        assert_eq!(
            tokens.check(TokenPurpose::Reset, &raw),
            Err(TokenError::Invalid)
        );
        assert_eq!(
            tokens.check(TokenPurpose::Access, &raw),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn tampered_token_is_rejected() {
        let tokens = service();
        let mut raw = tokens
            .issue(TokenPurpose::Access, 7, "ivanov@mail.ru")
            .expect("issue failed");
        raw.push('x');

        assert_eq!(
            tokens.check(TokenPurpose::Access, &raw),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new(&AuthSettings {
            access_secret: "access-secret".into(),
            email_verification_secret: "verify-secret".into(),
            password_reset_secret: "reset-secret".into(),
            sys_email: "noreply@coefin.dev".into(),
            access_ttl: Duration::ZERO,
            action_token_ttl: Duration::ZERO,
        });
        let raw = tokens
            .issue(TokenPurpose::Access, 7, "ivanov@mail.ru")
            .expect("issue failed");

        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(
            tokens.check(TokenPurpose::Access, &raw),
            Err(TokenError::Invalid)
        );
    }
}
