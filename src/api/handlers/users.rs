//! Account registration and token-gated profile operations.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::api::auth::{bearer::require_user, password, AuthState};
use crate::api::error::ApiError;
use crate::api::messages;
use crate::api::storage::{
    self, check_reset_authorization, delete_user as delete_user_record, insert_user, list_users,
    RegisterOutcome, ResetAuthorization, UserRecord,
};
use crate::api::types::{
    DetailResponse, ForgotPasswordRequest, MessageResponse, RegisterUserRequest,
    UpdatePasswordRequest, UserResponse, UserUpdateRequest, UsersResponse,
};
use crate::api::utils::valid_email;

fn user_response(user: UserRecord) -> UserResponse {
    UserResponse {
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
    }
}

/// Register a new account. Duplicate emails surface as 409 via the unique
/// constraint rather than a lookup, so concurrent registrations cannot race.
pub async fn create_user(
    pool: Extension<PgPool>,
    payload: Option<Json<RegisterUserRequest>>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest(messages::MISSING_PAYLOAD));
    };

    if !valid_email(&request.email) {
        return Err(ApiError::Unprocessable(messages::INVALID_EMAIL));
    }

    let password_hash = password::hash(&request.password)?;

    match insert_user(
        &pool,
        &request.first_name,
        &request.last_name,
        &request.email,
        &password_hash,
    )
    .await?
    {
        RegisterOutcome::Created(user) => Ok((StatusCode::CREATED, Json(user_response(user)))),
        RegisterOutcome::DuplicateEmail => {
            Err(ApiError::Conflict(messages::USER_ALREADY_EXISTS))
        }
    }
}

pub async fn get_all_users(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<UsersResponse>, ApiError> {
    require_user(&headers, &pool, &auth_state).await?;

    let users = list_users(&pool).await?;

    Ok(Json(UsersResponse {
        users: users.into_iter().map(user_response).collect(),
    }))
}

pub async fn get_user(
    Path(id): Path<i64>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<UserResponse>, ApiError> {
    require_user(&headers, &pool, &auth_state).await?;

    let user = storage::find_user_by_id(&pool, id)
        .await?
        .ok_or(ApiError::NotFound(messages::USER_NOT_FOUND))?;

    Ok(Json(user_response(user)))
}

/// Delete any account by id. The acting user's `token_version` is bumped in
/// the same transaction, so their own outstanding tokens die with the
/// deletion.
pub async fn delete_user(
    Path(id): Path<i64>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<StatusCode, ApiError> {
    let actor = require_user(&headers, &pool, &auth_state).await?;

    if !delete_user_record(&pool, id, actor.id).await? {
        return Err(ApiError::NotFound(messages::USER_NOT_FOUND));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Partial profile update; omitted fields are left untouched. Does not touch
/// `token_version`.
pub async fn update_detail(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UserUpdateRequest>>,
) -> Result<(StatusCode, Json<DetailResponse>), ApiError> {
    let actor = require_user(&headers, &pool, &auth_state).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest(messages::MISSING_PAYLOAD));
    };

    storage::update_details(
        &pool,
        actor.id,
        request.first_name.as_deref(),
        request.last_name.as_deref(),
    )
    .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DetailResponse {
            detail: messages::DETAILS_UPDATED,
        }),
    ))
}

/// Authenticated password change; requires the current password and revokes
/// all outstanding tokens, including the one used for this request.
pub async fn update_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UpdatePasswordRequest>>,
) -> Result<(StatusCode, Json<DetailResponse>), ApiError> {
    let actor = require_user(&headers, &pool, &auth_state).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest(messages::MISSING_PAYLOAD));
    };

    if !password::verify(&request.old_password, &actor.password_hash)? {
        return Err(ApiError::Unauthorized(messages::PASSWORDS_DO_NOT_MATCH));
    }

    let new_hash = password::hash(&request.new_password)?;
    storage::update_password(&pool, actor.id, &new_hash).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DetailResponse {
            detail: messages::PASSWORD_UPDATED,
        }),
    ))
}

/// Complete a password reset authorized by a verified reset-purpose code
/// inside the reset window. No bearer token required.
pub async fn forgot_password(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest(messages::MISSING_PAYLOAD));
    };

    let window_minutes = auth_state.config().reset_window_minutes();
    match check_reset_authorization(&pool, &request.email, window_minutes).await? {
        ResetAuthorization::Missing => return Err(ApiError::Forbidden(messages::OTP_REQUIRED)),
        ResetAuthorization::WindowExpired => {
            return Err(ApiError::Gone(messages::OTP_WINDOW_EXPIRED))
        }
        ResetAuthorization::Authorized => {}
    }

    let new_hash = password::hash(&request.new_password)?;
    if !storage::reset_password(&pool, &request.email, &new_hash).await? {
        return Err(ApiError::NotFound(messages::USER_NOT_FOUND));
    }

    Ok(Json(MessageResponse {
        message: messages::PASSWORD_RESET_SUCCESS,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::AuthConfig;
    use anyhow::Result;
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    fn auth_state() -> Arc<AuthState> {
        Arc::new(AuthState::new(AuthConfig::new(SecretString::from(
            "secret",
        ))))
    }

    #[tokio::test]
    async fn create_user_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = create_user(Extension(pool), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn create_user_invalid_email() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = create_user(
            Extension(pool),
            Some(Json(RegisterUserRequest {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "not-an-email".to_string(),
                password: "hunter2".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        Ok(())
    }

    #[tokio::test]
    async fn get_all_users_requires_token() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = get_all_users(HeaderMap::new(), Extension(pool), Extension(auth_state()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn get_user_requires_token() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = get_user(
            Path(1),
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn delete_user_requires_token() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = delete_user(
            Path(1),
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn update_password_requires_token() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = update_password(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn forgot_password_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = forgot_password(Extension(pool), Extension(auth_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
