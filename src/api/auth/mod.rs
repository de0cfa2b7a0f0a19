//! Auth state, configuration, and token/credential primitives.

pub mod bearer;
pub mod otp;
pub mod password;
pub mod token;

use jsonwebtoken::{DecodingKey, EncodingKey};
use secrecy::{ExposeSecret, SecretString};

const DEFAULT_TOKEN_TTL_MINUTES: i64 = 15;
const DEFAULT_RESET_WINDOW_MINUTES: i64 = 10;
const DEFAULT_OTP_TTL_SECONDS: i64 = 5 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    secret: SecretString,
    token_ttl_minutes: i64,
    reset_window_minutes: i64,
    otp_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            reset_window_minutes: DEFAULT_RESET_WINDOW_MINUTES,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.token_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_reset_window_minutes(mut self, minutes: i64) -> Self {
        self.reset_window_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub const fn token_ttl_minutes(&self) -> i64 {
        self.token_ttl_minutes
    }

    #[must_use]
    pub const fn reset_window_minutes(&self) -> i64 {
        self.reset_window_minutes
    }

    #[must_use]
    pub const fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }
}

/// Process-wide auth state shared with handlers via an `Extension`.
///
/// Signing keys are derived once from the secret at startup.
pub struct AuthState {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        let encoding_key = EncodingKey::from_secret(secret);
        let decoding_key = DecodingKey::from_secret(secret);
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub const fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    #[must_use]
    pub const fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}
