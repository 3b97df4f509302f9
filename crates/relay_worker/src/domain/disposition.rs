use std::fmt;

/// What happened when one delivery was relayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// The body is not a valid observation record
    Malformed(String),
    /// The HTTP request could not be built
    BuildFailed(String),
    /// The request was sent but no response arrived (refused, reset, timeout)
    TransportFailed(String),
    /// The backend answered with this status code
    Responded(u16),
}

/// How a delivery is settled on the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Remove from the queue
    Ack,
    /// Negative-acknowledge and redeliver
    Requeue,
    /// Negative-acknowledge and discard
    Drop,
}

/// Map a relay outcome to its broker disposition.
///
/// Only malformed input is discarded; every other failure is redelivered,
/// without limit.
pub fn decide(outcome: &ForwardOutcome) -> Disposition {
    match outcome {
        ForwardOutcome::Malformed(_) => Disposition::Drop,
        ForwardOutcome::BuildFailed(_) | ForwardOutcome::TransportFailed(_) => Disposition::Requeue,
        ForwardOutcome::Responded(status) if *status >= 400 => Disposition::Requeue,
        ForwardOutcome::Responded(_) => Disposition::Ack,
    }
}

impl ForwardOutcome {
    pub fn disposition(&self) -> Disposition {
        decide(self)
    }
}

impl fmt::Display for ForwardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "invalid payload: {}", e),
            Self::BuildFailed(e) => write!(f, "failed to build backend request: {}", e),
            Self::TransportFailed(e) => write!(f, "backend request failed: {}", e),
            Self::Responded(status) => write!(f, "backend responded with status {}", status),
        }
    }
}
