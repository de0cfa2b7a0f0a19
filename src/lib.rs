//! User accounts and authentication service.
//!
//! Registration, email verification via one-time codes, credential login
//! issuing stateful bearer tokens, password change and reset, token-gated
//! profile operations, and a per-client sliding-window rate governor.

pub mod api;
pub mod cli;
