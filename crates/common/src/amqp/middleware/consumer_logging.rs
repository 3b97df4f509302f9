use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::amqp::{ConsumeRequest, ConsumeResponse};
use tower::{Layer, Service};
use tracing::{error, info, Instrument, Span};

/// Tower layer that logs the outcome of every consumed delivery
#[derive(Clone, Default)]
pub struct AmqpConsumeLoggingLayer {
    queue: String,
}

impl AmqpConsumeLoggingLayer {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
        }
    }
}

impl<S> Layer<S> for AmqpConsumeLoggingLayer {
    type Service = AmqpConsumeLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        AmqpConsumeLoggingService {
            inner: service,
            queue: self.queue.clone(),
        }
    }
}

/// Service produced by `AmqpConsumeLoggingLayer`
#[derive(Clone)]
pub struct AmqpConsumeLoggingService<S> {
    inner: S,
    queue: String,
}

impl<S> Service<ConsumeRequest> for AmqpConsumeLoggingService<S>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse> + Clone + Send + 'static,
    S::Error: std::fmt::Display + Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: ConsumeRequest) -> Self::Future {
        let queue = self.queue.clone();
        let delivery_tag = req.delivery_tag;
        let redelivered = req.redelivered;
        let payload_size = req.payload.len();
        let start = Instant::now();

        // Drive the clone that poll_ready was called on
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let span = Span::current();

        Box::pin(
            async move {
                let result = inner.call(req).await;
                let duration_ms = start.elapsed().as_millis();

                match &result {
                    Ok(response) => {
                        let outcome = response.outcome();
                        info!(
                            queue = %queue,
                            delivery_tag,
                            redelivered,
                            payload_bytes = payload_size,
                            outcome = %outcome,
                            duration_ms = %duration_ms,
                            "consumed from {queue} in {duration_ms}ms [{outcome}]"
                        );
                    }
                    Err(e) => {
                        error!(
                            queue = %queue,
                            delivery_tag,
                            redelivered,
                            payload_bytes = payload_size,
                            duration_ms = %duration_ms,
                            error = %e,
                            "failed to consume from {queue} in {duration_ms}ms: {e}"
                        );
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
