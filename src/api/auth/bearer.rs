//! Bearer-token extraction for protected routes.

use axum::http::{header, HeaderMap};
use sqlx::PgPool;

use super::super::error::ApiError;
use super::super::storage::{self, UserRecord};
use super::{token, AuthState};

/// Resolve the calling user from the `Authorization` header.
///
/// Rejections are deliberately indistinguishable: a missing header, a bad
/// signature, an expired token, a stale `token_version`, and an inactive or
/// vanished user all produce the same opaque 401.
pub(crate) async fn require_user(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Result<UserRecord, ApiError> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::InvalidCredentials)?;

    let claims =
        token::verify(state.decoding_key(), bearer).map_err(|_| ApiError::InvalidCredentials)?;

    let user = storage::find_user_by_id(pool, claims.user_id)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if user.token_version != claims.token_version || !user.is_active {
        return Err(ApiError::InvalidCredentials);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::AuthConfig;
    use anyhow::Result;
    use axum::http::HeaderValue;
    use axum::response::IntoResponse;
    use axum::http::StatusCode;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    fn auth_state() -> AuthState {
        AuthState::new(AuthConfig::new(SecretString::from("secret")))
    }

    #[tokio::test]
    async fn missing_header_is_rejected() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let result = require_user(&HeaderMap::new(), &pool, &auth_state()).await;
        let status = result.err().map(|e| e.into_response().status());
        assert_eq!(status, Some(StatusCode::UNAUTHORIZED));
        Ok(())
    }

    #[tokio::test]
    async fn non_bearer_header_is_rejected() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert!(require_user(&headers, &pool, &auth_state()).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer not-a-token"),
        );
        assert!(require_user(&headers, &pool, &auth_state()).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn foreign_signature_is_rejected() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let other = AuthState::new(AuthConfig::new(SecretString::from("other-secret")));
        let token = token::issue(other.encoding_key(), 1, 0, 15)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
        assert!(require_user(&headers, &pool, &auth_state()).await.is_err());
        Ok(())
    }
}
