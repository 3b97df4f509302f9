use common::redact_credentials;
use config::{Config, ConfigError, Environment};
use relay_worker::domain::RelayError;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Deserialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    // Broker
    /// AMQP URL including credentials
    pub rabbitmq_url: String,

    /// Durable queue the observations are published to
    pub rabbitmq_queue: String,

    /// Empty lets the broker generate the tag
    #[serde(default)]
    pub rabbitmq_consumer_tag: String,

    /// Pause between a failed broker session and the next one
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    // Backend
    /// Ingestion endpoint receiving one POST per observation
    pub backend_internal_url: String,

    /// Sent as the X-WORKER-SECRET header
    pub worker_secret: String,

    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    /// Grace period for the worker to stop once shutdown starts
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "weather-relay".to_string()
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_backend_timeout_secs() -> u64 {
    10
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

impl ServiceConfig {
    /// Load from the process environment (`RABBITMQ_URL`, `WORKER_SECRET`, ...)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::default())
    }

    fn from_environment(source: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Reject values that deserialize fine but cannot be used
    pub fn validate(&self) -> Result<(), RelayError> {
        let required = [
            ("RABBITMQ_URL", &self.rabbitmq_url),
            ("RABBITMQ_QUEUE", &self.rabbitmq_queue),
            ("BACKEND_INTERNAL_URL", &self.backend_internal_url),
            ("WORKER_SECRET", &self.worker_secret),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(RelayError::MissingConfig(name.to_string()));
        }

        let durations = [
            ("BACKEND_TIMEOUT_SECS", self.backend_timeout_secs),
            ("RECONNECT_DELAY_SECS", self.reconnect_delay_secs),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, secs)| *secs == 0) {
            return Err(RelayError::InvalidConfig(format!(
                "{} must be greater than zero",
                name
            )));
        }

        Ok(())
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("log_level", &self.log_level)
            .field("service_name", &self.service_name)
            .field("rabbitmq_url", &redact_credentials(&self.rabbitmq_url))
            .field("rabbitmq_queue", &self.rabbitmq_queue)
            .field("rabbitmq_consumer_tag", &self.rabbitmq_consumer_tag)
            .field("reconnect_delay_secs", &self.reconnect_delay_secs)
            .field("backend_internal_url", &self.backend_internal_url)
            .field("worker_secret", &"***")
            .field("backend_timeout_secs", &self.backend_timeout_secs)
            .field("shutdown_timeout_secs", &self.shutdown_timeout_secs)
            .finish()
    }
}
