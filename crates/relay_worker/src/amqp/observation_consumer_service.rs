use crate::domain::{Disposition, ForwardOutcome, ObservationRelay};
use common::{ConsumeRequest, ConsumeResponse};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// Tower service relaying one observation delivery.
///
/// The relay never fails at the service level: every outcome, including
/// malformed input, is expressed as an Ack / Nack response.
#[derive(Clone)]
pub struct ObservationConsumerService {
    relay: Arc<ObservationRelay>,
}

impl ObservationConsumerService {
    pub fn new(relay: Arc<ObservationRelay>) -> Self {
        Self { relay }
    }
}

impl Service<ConsumeRequest> for ObservationConsumerService {
    type Response = ConsumeResponse;
    type Error = anyhow::Error;
    type Future = BoxFuture<'static, Result<ConsumeResponse, anyhow::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ConsumeRequest) -> Self::Future {
        let relay = Arc::clone(&self.relay);

        Box::pin(async move {
            let outcome = relay.relay(&req.payload).await;
            Ok(consume_response_for(&outcome))
        })
    }
}

/// Translate a relay outcome into the broker settlement
pub fn consume_response_for(outcome: &ForwardOutcome) -> ConsumeResponse {
    match outcome.disposition() {
        Disposition::Ack => ConsumeResponse::ack(),
        Disposition::Requeue => ConsumeResponse::requeue(outcome.to_string()),
        Disposition::Drop => ConsumeResponse::reject(outcome.to_string()),
    }
}
