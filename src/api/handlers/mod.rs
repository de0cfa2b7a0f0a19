pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod otp;
pub use self::otp::{request_otp, verify_otp};

pub mod users;

use axum::response::{IntoResponse, Json};
use serde_json::json;

// Root banner, also handy as a liveness probe that skips the database.
pub async fn root() -> impl IntoResponse {
    Json(json!({ "Hello": "World" }))
}
