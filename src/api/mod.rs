use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{delete, get, patch, post, put},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod auth;
pub mod error;
pub mod handlers;
pub mod messages;
pub mod rate_limit;
pub(crate) mod storage;
pub mod types;
pub(crate) mod utils;

use auth::{AuthConfig, AuthState};
use rate_limit::RateGovernor;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Build the API router.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/login", post(handlers::login))
        .route("/users/create", post(handlers::users::create_user))
        .route("/users/otp/request", post(handlers::request_otp))
        .route("/users/otp/verify", post(handlers::verify_otp))
        .route("/users/all", get(handlers::users::get_all_users))
        .route("/users/:id", get(handlers::users::get_user))
        .route("/users/delete/:id", delete(handlers::users::delete_user))
        .route("/users/update-detail", put(handlers::users::update_detail))
        .route(
            "/users/update-password",
            patch(handlers::users::update_password),
        )
        .route(
            "/users/forgot-password",
            patch(handlers::users::forgot_password),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    auth_config: AuthConfig,
    governor: Arc<dyn RateGovernor>,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let auth_state = Arc::new(AuthState::new(auth_config));

    let app = router().layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            // Admission control sits ahead of every route; the governor is
            // injected first so the middleware can reach it.
            .layer(Extension(governor))
            .layer(middleware::from_fn(rate_limit::govern))
            .layer(Extension(auth_state))
            .layer(Extension(pool)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    // Peer addresses feed the rate governor when no proxy headers are set.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::http::StatusCode;
    use rate_limit::SlidingWindowGovernor;
    use secrecy::SecretString;
    use tower::ServiceExt;

    fn test_app(max_requests: usize) -> Result<Router> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let auth_state = Arc::new(AuthState::new(AuthConfig::new(SecretString::from(
            "secret",
        ))));
        let governor: Arc<dyn RateGovernor> = Arc::new(SlidingWindowGovernor::new(
            max_requests,
            Duration::from_secs(60),
        ));

        Ok(router().layer(
            ServiceBuilder::new()
                .layer(Extension(governor))
                .layer(middleware::from_fn(rate_limit::govern))
                .layer(Extension(auth_state))
                .layer(Extension(pool)),
        ))
    }

    fn request_from(ip: &str) -> Result<Request<Body>> {
        Ok(Request::builder()
            .uri("/")
            .header("x-forwarded-for", ip)
            .body(Body::empty())?)
    }

    #[tokio::test]
    async fn governor_limits_after_budget() -> Result<()> {
        let app = test_app(2)?;

        for _ in 0..2 {
            let response = app.clone().oneshot(request_from("1.2.3.4")?).await?;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(request_from("1.2.3.4")?).await?;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        Ok(())
    }

    #[tokio::test]
    async fn governor_keys_by_client() -> Result<()> {
        let app = test_app(1)?;

        let response = app.clone().oneshot(request_from("1.2.3.4")?).await?;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(request_from("1.2.3.4")?).await?;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app.clone().oneshot(request_from("5.6.7.8")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn governor_keys_direct_clients_by_peer_address() -> Result<()> {
        let app = test_app(1)?;

        let request_from_peer = |ip: [u8; 4]| -> Result<Request<Body>> {
            let mut request = Request::builder().uri("/").body(Body::empty())?;
            request
                .extensions_mut()
                .insert(axum::extract::ConnectInfo(SocketAddr::from((ip, 4000))));
            Ok(request)
        };

        let response = app.clone().oneshot(request_from_peer([10, 0, 0, 1])?).await?;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(request_from_peer([10, 0, 0, 1])?).await?;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app.clone().oneshot(request_from_peer([10, 0, 0, 2])?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() -> Result<()> {
        let app = test_app(10)?;
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }
}
