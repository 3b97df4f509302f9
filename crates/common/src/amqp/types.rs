use crate::amqp::DeliveryAcker;
use anyhow::Result;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// A message received from the broker, together with the handle that settles it.
pub struct Delivery {
    /// Channel-scoped tag assigned by the broker
    pub delivery_tag: u64,
    /// Set when the broker has delivered this message before
    pub redelivered: bool,
    /// Raw message body
    pub payload: Bytes,
    acker: Arc<dyn DeliveryAcker>,
}

impl Delivery {
    pub fn new(
        delivery_tag: u64,
        redelivered: bool,
        payload: impl Into<Bytes>,
        acker: Arc<dyn DeliveryAcker>,
    ) -> Self {
        Self {
            delivery_tag,
            redelivered,
            payload: payload.into(),
            acker,
        }
    }

    /// Owned view of this delivery for handing to a Tower service
    pub fn to_request(&self) -> ConsumeRequest {
        ConsumeRequest::new(self.delivery_tag, self.redelivered, self.payload.clone())
    }

    /// Remove the message from the queue
    pub async fn ack(&self) -> Result<()> {
        self.acker.ack().await
    }

    /// Reject the message, optionally asking the broker to redeliver it
    pub async fn nack(&self, requeue: bool) -> Result<()> {
        self.acker.nack(requeue).await
    }

    /// Apply the decision carried by a `ConsumeResponse`
    pub async fn settle(&self, response: &ConsumeResponse) -> Result<()> {
        match response {
            ConsumeResponse::Ack => self.ack().await,
            ConsumeResponse::Nack { requeue, .. } => self.nack(*requeue).await,
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("delivery_tag", &self.delivery_tag)
            .field("redelivered", &self.redelivered)
            .field("payload_bytes", &self.payload.len())
            .finish()
    }
}

/// Request type for consuming a single broker delivery through Tower.
///
/// Owns the message data so it can travel through middleware layers
/// without borrowing from the delivery.
#[derive(Debug, Clone)]
pub struct ConsumeRequest {
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub payload: Bytes,
}

impl ConsumeRequest {
    pub fn new(delivery_tag: u64, redelivered: bool, payload: Bytes) -> Self {
        Self {
            delivery_tag,
            redelivered,
            payload,
        }
    }
}

/// How a consumed delivery must be settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeResponse {
    /// Processed - remove from the queue
    Ack,
    /// Rejected - redeliver when `requeue` is set, otherwise discard
    Nack {
        requeue: bool,
        reason: Option<String>,
    },
}

impl ConsumeResponse {
    pub fn ack() -> Self {
        Self::Ack
    }

    /// Reject and ask for redelivery
    pub fn requeue(reason: impl Into<String>) -> Self {
        Self::Nack {
            requeue: true,
            reason: Some(reason.into()),
        }
    }

    /// Reject permanently
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Nack {
            requeue: false,
            reason: Some(reason.into()),
        }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }

    pub fn is_requeue(&self) -> bool {
        matches!(self, Self::Nack { requeue: true, .. })
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Nack { requeue: false, .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ack => None,
            Self::Nack { reason, .. } => reason.as_deref(),
        }
    }

    /// Short label used in log lines
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::Nack { requeue: true, .. } => "requeue",
            Self::Nack { requeue: false, .. } => "drop",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amqp::MockDeliveryAcker;

    #[test]
    fn test_consume_response_ack() {
        let resp = ConsumeResponse::ack();
        assert!(resp.is_ack());
        assert!(!resp.is_requeue());
        assert!(!resp.is_dropped());
        assert_eq!(resp.outcome(), "ack");
        assert!(resp.reason().is_none());
    }

    #[test]
    fn test_consume_response_requeue() {
        let resp = ConsumeResponse::requeue("backend returned 503");
        assert!(resp.is_requeue());
        assert!(!resp.is_ack());
        assert_eq!(resp.outcome(), "requeue");
        assert_eq!(resp.reason(), Some("backend returned 503"));
    }

    #[test]
    fn test_consume_response_drop() {
        let resp = ConsumeResponse::reject("invalid payload");
        assert!(resp.is_dropped());
        assert!(!resp.is_requeue());
        assert_eq!(resp.outcome(), "drop");
    }

    #[tokio::test]
    async fn test_settle_ack_calls_ack_only() {
        let mut acker = MockDeliveryAcker::new();
        acker.expect_ack().times(1).returning(|| Ok(()));
        acker.expect_nack().never();

        let delivery = Delivery::new(7, false, "{}", Arc::new(acker));
        delivery.settle(&ConsumeResponse::ack()).await.unwrap();
    }

    #[tokio::test]
    async fn test_settle_nack_passes_requeue_flag() {
        let mut acker = MockDeliveryAcker::new();
        acker.expect_ack().never();
        acker
            .expect_nack()
            .withf(|requeue| !*requeue)
            .times(1)
            .returning(|_| Ok(()));

        let delivery = Delivery::new(8, true, "not-json", Arc::new(acker));
        delivery
            .settle(&ConsumeResponse::reject("invalid payload"))
            .await
            .unwrap();
    }

    #[test]
    fn test_to_request_copies_metadata() {
        let delivery = Delivery::new(42, true, "payload", Arc::new(MockDeliveryAcker::new()));
        let req = delivery.to_request();

        assert_eq!(req.delivery_tag, 42);
        assert!(req.redelivered);
        assert_eq!(req.payload, Bytes::from("payload"));
    }
}
