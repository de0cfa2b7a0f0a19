//! Stateful bearer tokens.
//!
//! The token is a signed HS256 JWT carrying the user id and the
//! `token_version` counter sampled at issuance. Verification here only covers
//! signature and expiry; callers compare the embedded version against the
//! user's current counter to revoke outstanding tokens on password changes.

use anyhow::{Context, Result};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i64,
    pub token_version: i64,
    pub exp: i64,
}

/// Why a presented token was rejected. All variants collapse to the same
/// opaque response at the HTTP boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthFailure {
    Malformed,
    Expired,
    BadSignature,
}

/// Issue a token for a user with the given version counter.
pub fn issue(key: &EncodingKey, user_id: i64, token_version: i64, ttl_minutes: i64) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before unix epoch")?;
    let exp = i64::try_from(now.as_secs()).context("timestamp out of range")? + ttl_minutes * 60;

    let claims = Claims {
        user_id,
        token_version,
        exp,
    };

    encode(&Header::new(Algorithm::HS256), &claims, key).context("failed to sign token")
}

/// Verify signature and expiry, returning the embedded claims.
pub fn verify(key: &DecodingKey, token: &str) -> Result<Claims, AuthFailure> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    match decode::<Claims>(token, key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(err) => match err.kind() {
            ErrorKind::ExpiredSignature => Err(AuthFailure::Expired),
            ErrorKind::InvalidSignature => Err(AuthFailure::BadSignature),
            _ => Err(AuthFailure::Malformed),
        },
    }
}
