mod config;

use common::{init_telemetry, redact_credentials, LapinConnector, TelemetryConfig};
use config::ServiceConfig;
use relay_runner::Runner;
use relay_worker::http::HttpBackendForwarder;
use relay_worker::relay_worker::{RelayWorker, RelayWorkerConfig};
use std::sync::Arc;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = init_telemetry(&TelemetryConfig {
        service_name: config.service_name.clone(),
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {:#}", e);
        std::process::exit(1);
    }

    info!(
        service = %config.service_name,
        broker = %redact_credentials(&config.rabbitmq_url),
        queue = %config.rabbitmq_queue,
        backend = %config.backend_internal_url,
        "Starting weather relay"
    );
    debug!("Configuration: {:?}", config);

    let forwarder = match HttpBackendForwarder::new(
        config.backend_internal_url.clone(),
        config.worker_secret.clone(),
        config.backend_timeout(),
    ) {
        Ok(forwarder) => forwarder,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Failed to create backend forwarder");
            std::process::exit(1);
        }
    };

    let connector = LapinConnector::new().with_connection_name(config.service_name.clone());

    let worker = RelayWorker::new(
        Arc::new(connector),
        Arc::new(forwarder),
        RelayWorkerConfig {
            broker_url: config.rabbitmq_url.clone(),
            queue: config.rabbitmq_queue.clone(),
            consumer_tag: config.rabbitmq_consumer_tag.clone(),
            reconnect_delay: config.reconnect_delay(),
        },
    );

    Runner::new()
        .with_named_process("relay_worker", worker.into_runner_process())
        .with_shutdown_timeout(config.shutdown_timeout())
        .run()
        .await;
}
