//! Per-client sliding-window admission control.
//!
//! Every request passes through [`govern`] before any route logic runs. State
//! is process-local and ephemeral; a restart clears all windows.

use axum::{
    extract::{ConnectInfo, Extension, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use super::error::ApiError;
use super::utils::extract_client_ip;

// Every SWEEP_INTERVAL admissions, drop clients whose entries all aged out.
// Client keys come from request headers, so the map must not grow forever.
const SWEEP_INTERVAL: u64 = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateGovernor: Send + Sync {
    fn admit(&self, client: &str) -> RateLimitDecision;
}

#[derive(Default)]
struct GovernorState {
    windows: HashMap<String, VecDeque<Instant>>,
    admissions: u64,
}

/// Admits up to `max_requests` per client within a trailing window.
///
/// Timestamps older than the window are pruned before counting, so a client
/// that stops sending becomes admissible again once its entries age out.
pub struct SlidingWindowGovernor {
    max_requests: usize,
    window: Duration,
    state: Mutex<GovernorState>,
}

impl SlidingWindowGovernor {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(GovernorState::default()),
        }
    }

    fn admit_at(&self, client: &str, now: Instant) -> RateLimitDecision {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        state.admissions += 1;
        if state.admissions % SWEEP_INTERVAL == 0 {
            let horizon = self.window;
            state.windows.retain(|_, window| {
                while window
                    .front()
                    .is_some_and(|&oldest| now.duration_since(oldest) >= horizon)
                {
                    window.pop_front();
                }
                !window.is_empty()
            });
        }

        let window = state.windows.entry(client.to_string()).or_default();

        // Prune, count, and record under one lock so concurrent requests from
        // the same client cannot both slip under the limit.
        while window
            .front()
            .is_some_and(|&oldest| now.duration_since(oldest) >= self.window)
        {
            window.pop_front();
        }

        if window.len() >= self.max_requests {
            return RateLimitDecision::Limited;
        }

        window.push_back(now);
        RateLimitDecision::Allowed
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .windows
            .len()
    }
}

impl RateGovernor for SlidingWindowGovernor {
    fn admit(&self, client: &str) -> RateLimitDecision {
        self.admit_at(client, Instant::now())
    }
}

#[derive(Clone, Debug)]
pub struct NoopGovernor;

impl RateGovernor for NoopGovernor {
    fn admit(&self, _client: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// Identity a request is rate-limited under: proxy headers first, then the
/// peer address, so direct clients do not share one bucket.
fn client_key(request: &Request) -> String {
    extract_client_ip(request.headers())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware applying the governor to every request.
pub async fn govern(
    governor: Extension<Arc<dyn RateGovernor>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request);

    match governor.admit(&client) {
        RateLimitDecision::Allowed => next.run(request).await,
        RateLimitDecision::Limited => ApiError::RateLimited.into_response(),
    }
}
