//! One-time code request and verification.

use anyhow::anyhow;
use axum::{extract::Extension, http::StatusCode, Json};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::auth::{otp, AuthState};
use crate::api::error::ApiError;
use crate::api::messages;
use crate::api::storage::{find_otp, find_user_by_email, mark_otp_verified, upsert_otp};
use crate::api::types::{MessageResponse, OtpPurpose, OtpRequest, OtpSentResponse, VerifyOtpRequest};

/// Issue a code for email verification or password reset.
///
/// The plaintext code is returned in the body; delivery is the caller's
/// concern.
pub async fn request_otp(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<OtpRequest>>,
) -> Result<Json<OtpSentResponse>, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest(messages::MISSING_PAYLOAD));
    };

    let purpose = OtpPurpose::parse(&request.purpose)
        .ok_or(ApiError::Unprocessable(messages::INVALID_OTP_PURPOSE))?;

    let user = find_user_by_email(&pool, &request.email)
        .await?
        .ok_or(ApiError::NotFound(messages::USER_DOES_NOT_EXIST))?;

    if user.is_email_verified && purpose == OtpPurpose::EmailVerification {
        return Err(ApiError::Conflict(messages::EMAIL_ALREADY_VERIFIED));
    }
    if !user.is_email_verified && purpose == OtpPurpose::ForgotPassword {
        return Err(ApiError::Conflict(
            messages::EMAIL_VERIFICATION_PURPOSE_MISMATCH,
        ));
    }

    if let Some(record) = find_otp(&pool, &request.email).await? {
        if record.live {
            return Err(ApiError::Conflict(messages::OTP_ALREADY_SENT));
        }
    }

    let code = otp::generate();
    let ttl_seconds = auth_state.config().otp_ttl_seconds();
    upsert_otp(&pool, &request.email, &code, purpose, ttl_seconds).await?;

    Ok(Json(OtpSentResponse {
        message: messages::OTP_SENT,
        otp: code,
        expires_in: ttl_seconds,
    }))
}

/// Verify a presented code. Verification-purpose codes flip the user's email
/// flag and are consumed; reset-purpose codes stay behind to authorize the
/// follow-up password reset.
pub async fn verify_otp(
    pool: Extension<PgPool>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest(messages::MISSING_PAYLOAD));
    };

    let record = find_otp(&pool, &request.email)
        .await?
        .ok_or(ApiError::NotFound(messages::OTP_NOT_FOUND))?;

    if record.otp != request.otp {
        return Err(ApiError::BadRequest(messages::OTP_INVALID));
    }

    if !record.live {
        return Err(ApiError::Gone(messages::OTP_EXPIRED));
    }

    find_user_by_email(&pool, &request.email)
        .await?
        .ok_or(ApiError::NotFound(messages::USER_DOES_NOT_EXIST))?;

    // A stored purpose outside the closed set means the row was tampered with.
    let purpose = OtpPurpose::parse(&record.purpose)
        .ok_or_else(|| anyhow!("unknown otp purpose in storage: {}", record.purpose))?;

    mark_otp_verified(&pool, &request.email, purpose).await?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: messages::OTP_VERIFIED,
        }),
    ))
}
