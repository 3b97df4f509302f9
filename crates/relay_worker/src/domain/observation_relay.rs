use crate::domain::{ForwardError, ForwardOutcome, ObservationForwarder, ObservationRecord};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Domain service that relays one broker message body to the backend.
///
/// Flow:
/// 1. Decode the body as an `ObservationRecord`
/// 2. Forward it through the `ObservationForwarder`
/// 3. Report what happened as a `ForwardOutcome`
///
/// Malformed bodies never reach the forwarder.
pub struct ObservationRelay {
    forwarder: Arc<dyn ObservationForwarder>,
}

impl ObservationRelay {
    pub fn new(forwarder: Arc<dyn ObservationForwarder>) -> Self {
        Self { forwarder }
    }

    #[instrument(skip(self, payload), fields(payload_bytes = payload.len()))]
    pub async fn relay(&self, payload: &[u8]) -> ForwardOutcome {
        let record = match ObservationRecord::from_json(payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "invalid observation payload");
                return ForwardOutcome::Malformed(e.to_string());
            }
        };

        debug!(timestamp = %record.timestamp, source = %record.source, "forwarding observation");

        match self.forwarder.forward(&record).await {
            Ok(status) if status >= 400 => {
                warn!(timestamp = %record.timestamp, status, "backend returned error");
                ForwardOutcome::Responded(status)
            }
            Ok(status) => {
                info!(timestamp = %record.timestamp, status, "observation processed");
                ForwardOutcome::Responded(status)
            }
            Err(ForwardError::Build(e)) => {
                warn!(timestamp = %record.timestamp, error = %e, "failed to build backend request");
                ForwardOutcome::BuildFailed(e)
            }
            Err(ForwardError::Transport(e)) => {
                warn!(timestamp = %record.timestamp, error = %e, "backend request failed");
                ForwardOutcome::TransportFailed(e)
            }
        }
    }
}
