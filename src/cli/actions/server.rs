use crate::api;
use crate::api::auth::AuthConfig;
use crate::api::rate_limit::{RateGovernor, SlidingWindowGovernor};
use crate::cli::actions::Action;
use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tracing::info;

/// Handle the server action
/// # Errors
/// Returns an error if the server fails to start.
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            secret,
            token_ttl_minutes,
            reset_window_minutes,
            otp_ttl_seconds,
            rate_limit,
            rate_window_seconds,
        } => {
            info!(
                port,
                token_ttl_minutes,
                reset_window_minutes,
                otp_ttl_seconds,
                rate_limit,
                rate_window_seconds,
                "Starting server"
            );

            let auth_config = AuthConfig::new(secret)
                .with_token_ttl_minutes(token_ttl_minutes)
                .with_reset_window_minutes(reset_window_minutes)
                .with_otp_ttl_seconds(otp_ttl_seconds);

            let governor: Arc<dyn RateGovernor> = Arc::new(SlidingWindowGovernor::new(
                rate_limit,
                Duration::from_secs(rate_window_seconds),
            ));

            api::new(port, dsn, auth_config, governor).await?;
        }
    }

    Ok(())
}
