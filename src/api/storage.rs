//! Database helpers for accounts and one-time codes.
//!
//! Handlers never touch SQL directly; everything goes through this small
//! repository so multi-row mutations stay transactional.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::types::OtpPurpose;
use super::utils::is_unique_violation;

#[derive(Debug)]
pub(crate) struct UserRecord {
    pub(crate) id: i64,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) is_email_verified: bool,
    pub(crate) token_version: i64,
    pub(crate) is_active: bool,
}

/// One-time code state for an email, with liveness computed server-side so
/// clock decisions stay in one place.
#[derive(Debug)]
pub(crate) struct OtpRecord {
    pub(crate) otp: String,
    pub(crate) purpose: String,
    pub(crate) live: bool,
}

/// Outcome when attempting to create a new account.
#[derive(Debug)]
pub(crate) enum RegisterOutcome {
    Created(UserRecord),
    DuplicateEmail,
}

/// Whether a verified reset-purpose code authorizes a password reset.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ResetAuthorization {
    Missing,
    WindowExpired,
    Authorized,
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        is_email_verified: row.get("is_email_verified"),
        token_version: row.get("token_version"),
        is_active: row.get("is_active"),
    }
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, is_email_verified, token_version, is_active";

pub(crate) async fn insert_user(
    pool: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password_hash: &str,
) -> Result<RegisterOutcome> {
    let query = "
        INSERT INTO users (first_name, last_name, email, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING id, first_name, last_name, email, password_hash,
                  is_email_verified, token_version, is_active
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(RegisterOutcome::Created(user_from_row(&row))),
        Err(err) if is_unique_violation(&err) => Ok(RegisterOutcome::DuplicateEmail),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

pub(crate) async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.map(|row| user_from_row(&row)))
}

pub(crate) async fn find_user_by_id(pool: &PgPool, id: i64) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.map(|row| user_from_row(&row)))
}

pub(crate) async fn list_users(pool: &PgPool) -> Result<Vec<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list users")?;

    Ok(rows.iter().map(user_from_row).collect())
}

/// Partial update of profile names; absent fields keep their current value.
pub(crate) async fn update_details(
    pool: &PgPool,
    user_id: i64,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<()> {
    let query = "
        UPDATE users
        SET first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name)
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(first_name)
        .bind(last_name)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update user details")?;

    Ok(())
}

/// Swap the password hash and bump `token_version`, revoking outstanding
/// tokens in the same statement.
pub(crate) async fn update_password(pool: &PgPool, user_id: i64, new_hash: &str) -> Result<()> {
    let query = "
        UPDATE users
        SET password_hash = $2, token_version = token_version + 1
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(new_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password")?;

    Ok(())
}

/// Delete a user and bump the acting user's `token_version` atomically.
///
/// Returns false when the target does not exist.
pub(crate) async fn delete_user(pool: &PgPool, target_id: i64, actor_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin delete transaction")?;

    let query = "DELETE FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let deleted = sqlx::query(query)
        .bind(target_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to delete user")?;

    if deleted.rows_affected() == 0 {
        let _ = tx.rollback().await;
        return Ok(false);
    }

    let query = "UPDATE users SET token_version = token_version + 1 WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(actor_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to bump deleter token version")?;

    tx.commit().await.context("commit delete transaction")?;

    Ok(true)
}

pub(crate) async fn find_otp(pool: &PgPool, email: &str) -> Result<Option<OtpRecord>> {
    let query = "
        SELECT otp, purpose, (otp_expiry > NOW()) AS live
        FROM otp
        WHERE email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup otp")?;

    Ok(row.map(|row| OtpRecord {
        otp: row.get("otp"),
        purpose: row.get("purpose"),
        live: row.get("live"),
    }))
}

/// Issue or re-issue the single code slot for an email.
///
/// The upsert resets verification state, so a fresh code always starts
/// unverified.
pub(crate) async fn upsert_otp(
    pool: &PgPool,
    email: &str,
    code: &str,
    purpose: OtpPurpose,
    ttl_seconds: i64,
) -> Result<()> {
    let query = "
        INSERT INTO otp (email, otp, otp_expiry, purpose)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'), $4)
        ON CONFLICT (email) DO UPDATE
        SET otp = EXCLUDED.otp,
            otp_expiry = EXCLUDED.otp_expiry,
            purpose = EXCLUDED.purpose,
            is_verified = FALSE,
            verified_at = NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(code)
        .bind(ttl_seconds)
        .bind(purpose.as_str())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to upsert otp")?;

    Ok(())
}

/// Mark a code verified; verification codes also flip the user's email flag
/// and consume the record in the same transaction.
pub(crate) async fn mark_otp_verified(
    pool: &PgPool,
    email: &str,
    purpose: OtpPurpose,
) -> Result<()> {
    let mut tx = pool.begin().await.context("begin verify transaction")?;

    let query = "UPDATE otp SET is_verified = TRUE, verified_at = NOW() WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to mark otp verified")?;

    if purpose == OtpPurpose::EmailVerification {
        let query = "UPDATE users SET is_email_verified = TRUE WHERE email = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(email)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to flag email verified")?;

        let query = "DELETE FROM otp WHERE email = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(email)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to consume verified otp")?;
    }

    tx.commit().await.context("commit verify transaction")?;

    Ok(())
}

/// Check whether a verified reset-purpose code is still inside the reset
/// window. An expired record is deleted so the next attempt starts over.
pub(crate) async fn check_reset_authorization(
    pool: &PgPool,
    email: &str,
    window_minutes: i64,
) -> Result<ResetAuthorization> {
    let query = "
        SELECT (verified_at IS NOT NULL
                AND verified_at + ($2 * INTERVAL '1 minute') > NOW()) AS within_window
        FROM otp
        WHERE email = $1 AND purpose = $3 AND is_verified = TRUE
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(window_minutes)
        .bind(OtpPurpose::ForgotPassword.as_str())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check reset authorization")?;

    let Some(row) = row else {
        return Ok(ResetAuthorization::Missing);
    };

    if row.get::<bool, _>("within_window") {
        return Ok(ResetAuthorization::Authorized);
    }

    let query = "DELETE FROM otp WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete expired reset otp")?;

    Ok(ResetAuthorization::WindowExpired)
}

/// Complete a password reset: swap the hash, bump `token_version`, and
/// consume the code, all atomically. Returns false when the user vanished.
pub(crate) async fn reset_password(pool: &PgPool, email: &str, new_hash: &str) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin reset transaction")?;

    let query = "
        UPDATE users
        SET password_hash = $2, token_version = token_version + 1
        WHERE email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let updated = sqlx::query(query)
        .bind(email)
        .bind(new_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to reset password")?;

    if updated.rows_affected() == 0 {
        let _ = tx.rollback().await;
        return Ok(false);
    }

    let query = "DELETE FROM otp WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume reset otp")?;

    tx.commit().await.context("commit reset transaction")?;

    Ok(true)
}
