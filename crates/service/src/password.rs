//! Password generation and hashing.
//!
//! Users created implicitly during order placement receive a random
//! credential; a real one is set later through the email-confirmation flow.

use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};

use crate::ServiceError;

/// Length of generated passwords.
pub const GENERATED_PASSWORD_LEN: usize = 16;

/// Generates a random alphanumeric password.
pub fn generate() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Hashes a plain-text password with bcrypt.
pub fn hash(plain: &str) -> Result<String, ServiceError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
        .map_err(|e| ServiceError::Unexpected(format!("Password hashing failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_password_shape() {
        let password = generate();
        assert_eq!(password.len(), GENERATED_PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_passwords_differ() {
        assert_ne!(generate(), generate());
    }

    #[test]
    fn test_hash_verifies() {
        let hashed = hash("secret-password").unwrap();
        assert!(bcrypt::verify("secret-password", &hashed).unwrap());
        assert!(!bcrypt::verify("wrong-password", &hashed).unwrap());
    }
}
