//! Argon2 password hashing.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash a password with a fresh random salt.
pub fn hash(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check a password against a stored hash. Unparseable hashes count as
/// a mismatch.
pub fn verify(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trip() {
        let hashed = hash("N7#kq!pzW3vd").expect("hashing failed");
        assert!(verify("N7#kq!pzW3vd", &hashed));
        assert!(!verify("wrong-password", &hashed));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash("N7#kq!pzW3vd").expect("hashing failed");
        let b = hash("N7#kq!pzW3vd").expect("hashing failed");
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_stored_hash_never_verifies() {
        assert!(!verify("anything", "not-a-phc-string"));
    }
}
