/// Password hashing and verification
use crate::error::{ApiError, ApiResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// An Argon2id digest of an account password.
///
/// A value of this type exists only where a password actually changed
/// (registration, password change), so hashing can never run twice over the
/// same digest and no other write path can reach the credential column.
#[derive(Debug, Clone)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Hash a plaintext password with a fresh random salt
    pub fn new(plaintext: &str) -> ApiResult<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?
            .to_string();
        Ok(Self(digest))
    }

    /// Wrap an already-stored digest loaded from the database
    pub fn from_stored(digest: String) -> Self {
        Self(digest)
    }

    /// Verify a plaintext password against this digest
    pub fn verify(&self, plaintext: &str) -> bool {
        let parsed = match argon2::PasswordHash::new(&self.0) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// The PHC-format string persisted to the credential column
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let digest = PasswordDigest::new("correct horse battery staple").unwrap();
        assert!(digest.verify("correct horse battery staple"));
        assert!(!digest.verify("wrong password"));
    }

    #[test]
    fn digest_never_equals_plaintext() {
        let digest = PasswordDigest::new("p1").unwrap();
        assert_ne!(digest.as_str(), "p1");
        assert!(digest.as_str().starts_with("$argon2"));
    }

    #[test]
    fn salts_are_random() {
        let a = PasswordDigest::new("same input").unwrap();
        let b = PasswordDigest::new("same input").unwrap();
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn malformed_stored_digest_fails_closed() {
        let digest = PasswordDigest::from_stored("not a phc string".to_string());
        assert!(!digest.verify("anything"));
    }
}
