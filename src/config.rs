//! Runtime settings read from the Lambda environment

use std::env;
use std::time::Duration;

use crate::connection::Timeouts;

pub const MONGODB_URI_VAR: &str = "MONGODB_URI";
pub const REDIS_URI_VAR: &str = "REDIS_URI";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Variable holding the document-store URI; its value is read lazily by the slot
    pub mongodb_uri_var: String,
    pub redis_uri_var: String,
    pub timeouts: Timeouts,
    pub database: String,
    pub collection: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            mongodb_uri_var: MONGODB_URI_VAR.to_string(),
            redis_uri_var: REDIS_URI_VAR.to_string(),
            timeouts: Timeouts {
                connect: seconds(env::var("CONNECT_TIMEOUT_SECS").ok(), 10, 60),
                probe: seconds(env::var("PING_TIMEOUT_SECS").ok(), 5, 30),
            },
            database: non_empty(env::var("GREETER_DATABASE").ok(), "mlgmr"),
            collection: non_empty(env::var("GREETER_COLLECTION").ok(), "name"),
        }
    }
}

// Parse a whole number of seconds, clamped to 1..=max
fn seconds(raw: Option<String>, default: u64, max: u64) -> Duration {
    let secs = raw
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(default)
        .clamp(1, max);
    Duration::from_secs(secs)
}

fn non_empty(raw: Option<String>, default: &str) -> String {
    match raw {
        Some(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}
