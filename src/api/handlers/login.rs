//! Credential login issuing bearer tokens.

use axum::{extract::Extension, Form, Json};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::auth::{password, token, AuthState};
use crate::api::error::ApiError;
use crate::api::messages;
use crate::api::storage::find_user_by_email;
use crate::api::types::{LoginForm, TokenResponse};

/// Exchange email + password for an access token.
///
/// The `username` form field carries the email. Check order is existence,
/// email verification, then password; the differing status codes are a
/// documented trade-off in favor of client ergonomics.
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Form<LoginForm>>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Some(Form(form)) = payload else {
        return Err(ApiError::BadRequest(messages::MISSING_PAYLOAD));
    };

    let user = find_user_by_email(&pool, &form.username)
        .await?
        .ok_or(ApiError::BadRequest(messages::BAD_LOGIN_REQUEST))?;

    if !user.is_email_verified {
        return Err(ApiError::BadRequest(messages::EMAIL_NOT_VERIFIED));
    }

    if !password::verify(&form.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(messages::WRONG_CREDS));
    }

    let access_token = token::issue(
        auth_state.encoding_key(),
        user.id,
        user.token_version,
        auth_state.config().token_ttl_minutes(),
    )?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        token_version: user.token_version,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::AuthConfig;
    use anyhow::Result;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    fn auth_state() -> Arc<AuthState> {
        Arc::new(AuthState::new(AuthConfig::new(SecretString::from(
            "secret",
        ))))
    }

    #[tokio::test]
    async fn login_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = login(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
