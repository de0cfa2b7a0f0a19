//! Password hashing with Argon2id.
//!
//! A malformed stored hash is an integrity fault, not a user error, so
//! `verify` reports it as `Err` instead of a plain mismatch.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a plaintext password with a fresh random salt.
pub fn hash(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hashed = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hashed.to_string())
}

/// Check a plaintext password against a stored hash.
///
/// Comparison is constant-time inside argon2.
pub fn verify(plaintext: &str, stored: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored).map_err(|err| anyhow!("malformed password hash: {err}"))?;
    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(anyhow!("failed to verify password: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn hash_and_verify_round_trip() -> Result<()> {
        let hashed = hash("hunter2")?;
        assert!(verify("hunter2", &hashed)?);
        Ok(())
    }

    #[test]
    fn verify_rejects_wrong_password() -> Result<()> {
        let hashed = hash("hunter2")?;
        assert!(!verify("hunter3", &hashed)?);
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash("hunter2")?;
        let second = hash("hunter2")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        assert!(verify("hunter2", "not-a-phc-string").is_err());
    }
}
