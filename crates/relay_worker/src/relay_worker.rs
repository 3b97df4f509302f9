use crate::amqp::ObservationConsumerService;
use crate::domain::{ObservationForwarder, ObservationRelay, RelayResult};
use crate::session::{RelaySession, SessionSettings};
use common::{AmqpConnector, AmqpConsumeLoggingLayer};
use relay_runner::{AppProcess, ProcessFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tracing::{debug, error, info};

pub struct RelayWorkerConfig {
    pub broker_url: String,
    pub queue: String,
    pub consumer_tag: String,
    /// Fixed pause between a failed session and the next attempt
    pub reconnect_delay: Duration,
}

/// Relays weather observations from a broker queue to the backend.
///
/// `run` supervises broker sessions: whenever a session fails to establish
/// or its delivery stream closes, the failure is logged and a brand new
/// session is attempted after `reconnect_delay`. There is no attempt limit.
pub struct RelayWorker {
    connector: Arc<dyn AmqpConnector>,
    relay: Arc<ObservationRelay>,
    settings: SessionSettings,
    reconnect_delay: Duration,
}

impl RelayWorker {
    pub fn new(
        connector: Arc<dyn AmqpConnector>,
        forwarder: Arc<dyn ObservationForwarder>,
        config: RelayWorkerConfig,
    ) -> Self {
        debug!("initializing relay worker module");
        Self {
            connector,
            relay: Arc::new(ObservationRelay::new(forwarder)),
            settings: SessionSettings {
                broker_url: config.broker_url,
                queue: config.queue,
                consumer_tag: config.consumer_tag,
            },
            reconnect_delay: config.reconnect_delay,
        }
    }

    /// Run sessions until cancelled
    pub async fn run(&self, ctx: CancellationToken) -> anyhow::Result<()> {
        info!(queue = %self.settings.queue, "relay worker started");

        let mut cycle: u64 = 0;
        while !ctx.is_cancelled() {
            cycle += 1;

            match self.run_session(&ctx).await {
                Ok(()) => break,
                Err(e) if e.is_retryable() => {
                    error!(
                        error = %e,
                        cycle,
                        retry_in_secs = self.reconnect_delay.as_secs_f64(),
                        "relay session ended, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }

            tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        info!(queue = %self.settings.queue, "relay worker stopped");
        Ok(())
    }

    async fn run_session(&self, ctx: &CancellationToken) -> RelayResult<()> {
        let session = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                info!(queue = %self.settings.queue, "cancelled while establishing session");
                return Ok(());
            }
            session = RelaySession::establish(self.connector.as_ref(), &self.settings) => session?,
        };

        let service = ServiceBuilder::new()
            .layer(AmqpConsumeLoggingLayer::new(self.settings.queue.clone()))
            .service(ObservationConsumerService::new(Arc::clone(&self.relay)));

        session.run(service, ctx.clone()).await
    }

    pub fn into_runner_process(self) -> AppProcess {
        Box::new(move |ctx: CancellationToken| -> ProcessFuture {
            Box::pin(async move { self.run(ctx).await })
        })
    }
}
