pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        secret: SecretString,
        token_ttl_minutes: i64,
        reset_window_minutes: i64,
        otp_ttl_seconds: i64,
        rate_limit: usize,
        rate_window_seconds: u64,
    },
}
