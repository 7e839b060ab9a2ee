//! Structured JSON logging and per-invocation logging

use std::fmt::Display;
use std::future::Future;
use std::sync::OnceLock;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the JSON subscriber once per container
///
/// The level comes from `LOG_LEVEL` (`DEBUG`, `INFO`, `WARN`, `ERROR`);
/// unset or unknown values log at debug.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let level = level_from(std::env::var("LOG_LEVEL").ok().as_deref());

        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::new(level))
            .with_target(false)
            .with_current_span(false)
            .without_time()
            .finish();

        // Another subscriber may already be installed (tests, runtime helpers)
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }
    });
}

fn level_from(raw: Option<&str>) -> &'static str {
    match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
        Some("INFO") => "info",
        Some("WARN") => "warn",
        Some("ERROR") => "error",
        _ => "debug",
    }
}

/// Run one invocation, logging its input, output and failure
pub async fn log_invocation<I, O, E, F>(input: &I, invocation: F) -> Result<O, E>
where
    I: Serialize,
    O: Serialize,
    E: Display,
    F: Future<Output = Result<O, E>>,
{
    let input_json = to_json(input);
    tracing::debug!(input = %input_json, "Lambda invocation started");

    let result = invocation.await;

    match &result {
        Ok(output) => tracing::debug!(
            input = %input_json,
            output = %to_json(output),
            "Lambda invocation completed"
        ),
        Err(err) => tracing::error!(
            input = %input_json,
            error = %err,
            "Lambda invocation failed"
        ),
    }

    result
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from() {
        assert_eq!(level_from(None), "debug");
        assert_eq!(level_from(Some("WARN")), "warn");
        assert_eq!(level_from(Some("error")), "error");
        assert_eq!(level_from(Some("INFO")), "info");
        assert_eq!(level_from(Some("verbose")), "debug");
    }

    #[tokio::test]
    async fn test_log_invocation_passes_result_through() {
        init_logging();

        let ok: Result<u32, String> = log_invocation(&"in", async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err: Result<u32, String> =
            log_invocation(&"in", async { Err("boom".to_string()) }).await;
        assert_eq!(err, Err("boom".to_string()));
    }
}
