use crate::amqp::{ConsumeRequest, ConsumeResponse, Delivery, DeliveryStream};
use anyhow::{anyhow, Result};
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::{debug, error, info, warn};

/// Drives a Tower service over a broker delivery stream.
///
/// Deliveries are handled strictly one at a time in receipt order. Each one
/// is converted to an owned `ConsumeRequest`, passed to the service, and
/// settled according to the returned `ConsumeResponse` before the next
/// delivery is pulled.
///
/// `run` only returns `Ok` on cancellation. A closed or failed delivery
/// stream is reported as an error so the owner can re-establish the session.
pub struct AmqpConsumer<S> {
    deliveries: Box<dyn DeliveryStream>,
    queue: String,
    service: S,
}

impl<S> AmqpConsumer<S>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse, Error = anyhow::Error> + Send,
    S::Future: Send,
{
    pub fn new(deliveries: Box<dyn DeliveryStream>, queue: &str, service: S) -> Self {
        Self {
            deliveries,
            queue: queue.to_string(),
            service,
        }
    }

    /// Run the consumer loop until cancellation or stream closure
    pub async fn run(mut self, ctx: CancellationToken) -> Result<()> {
        debug!(queue = %self.queue, "starting amqp consumer");

        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    info!(queue = %self.queue, "received shutdown signal, stopping consumer");
                    return Ok(());
                }
                next = self.deliveries.next_delivery() => next,
            };

            match next {
                Some(Ok(delivery)) => self.process_delivery(delivery).await,
                Some(Err(e)) => {
                    return Err(e.context(format!("delivery stream for '{}' failed", self.queue)));
                }
                None => {
                    return Err(anyhow!("delivery stream for '{}' closed", self.queue));
                }
            }
        }
    }

    async fn process_delivery(&mut self, delivery: Delivery) {
        let request = delivery.to_request();

        let response = match self.service.ready().await {
            Ok(service) => service.call(request).await,
            Err(e) => Err(e),
        };

        let response = response.unwrap_or_else(|e| {
            error!(
                delivery_tag = delivery.delivery_tag,
                error = %e,
                "service error processing delivery"
            );
            ConsumeResponse::requeue(e.to_string())
        });

        if let ConsumeResponse::Nack { requeue, reason } = &response {
            warn!(
                delivery_tag = delivery.delivery_tag,
                requeue = *requeue,
                reason = reason.as_deref().unwrap_or_default(),
                "rejecting delivery"
            );
        }

        if let Err(e) = delivery.settle(&response).await {
            error!(
                delivery_tag = delivery.delivery_tag,
                outcome = response.outcome(),
                error = %e,
                "failed to settle delivery"
            );
        }
    }
}
