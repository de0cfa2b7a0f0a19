//! Request and response bodies for the account endpoints.

use serde::{Deserialize, Serialize};

/// What a one-time code was requested for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpPurpose {
    EmailVerification,
    ForgotPassword,
}

impl OtpPurpose {
    /// Parse the wire value; anything outside the closed set is rejected.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "email_verification" => Some(Self::EmailVerification),
            "forgot_password" => Some(Self::ForgotPassword),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::ForgotPassword => "forgot_password",
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RegisterUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct UserUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Purpose stays a string here so an unknown value maps to 422 instead of a
/// deserialization failure.
#[derive(Deserialize, Debug)]
pub struct OtpRequest {
    pub email: String,
    pub purpose: String,
}

#[derive(Deserialize, Debug)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
    pub new_password: String,
}

/// OAuth2-style password form; `username` carries the email.
#[derive(Deserialize, Debug)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct UserResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Serialize, Debug)]
pub struct UsersResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Serialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub token_version: i64,
}

#[derive(Serialize, Debug)]
pub struct OtpSentResponse {
    pub message: &'static str,
    pub otp: String,
    pub expires_in: i64,
}

#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Serialize, Debug)]
pub struct DetailResponse {
    pub detail: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_purpose_parses_known_values() {
        assert_eq!(
            OtpPurpose::parse("email_verification"),
            Some(OtpPurpose::EmailVerification)
        );
        assert_eq!(
            OtpPurpose::parse("forgot_password"),
            Some(OtpPurpose::ForgotPassword)
        );
    }

    #[test]
    fn otp_purpose_rejects_unknown_values() {
        assert_eq!(OtpPurpose::parse("password_reset"), None);
        assert_eq!(OtpPurpose::parse("EMAIL_VERIFICATION"), None);
        assert_eq!(OtpPurpose::parse(""), None);
    }

    #[test]
    fn otp_purpose_round_trip() {
        for purpose in [OtpPurpose::EmailVerification, OtpPurpose::ForgotPassword] {
            assert_eq!(OtpPurpose::parse(purpose.as_str()), Some(purpose));
        }
    }
}
