use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::TelemetryConfig;

/// Install the global tracing subscriber.
///
/// Logs are written to stdout as JSON with span lists. `RUST_LOG` takes
/// precedence over `config.log_level` when set.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<()> {
    let env_filter = build_env_filter(&config.log_level)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_span_list(true)
        .with_current_span(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    info!(service = %config.service_name, log_level = %config.log_level, "logging initialized");
    Ok(())
}

fn build_env_filter(log_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level '{}'", log_level)),
    }
}
