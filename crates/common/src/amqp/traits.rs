use crate::amqp::Delivery;
use anyhow::Result;
use async_trait::async_trait;

/// Dials the broker.
/// Every call produces a brand new connection owned by the caller.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AmqpConnector: Send + Sync {
    /// Open a connection to the broker at `url`
    async fn connect(&self, url: &str) -> Result<Box<dyn AmqpConnection>>;
}

/// An open broker connection
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AmqpConnection: Send + Sync {
    /// Open a channel multiplexed over this connection
    async fn create_channel(&self) -> Result<Box<dyn AmqpChannel>>;

    /// Close the connection. Closing an already closed connection is not an error.
    async fn close(&self) -> Result<()>;
}

/// A channel on an open connection. Not shared between processing paths.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AmqpChannel: Send + Sync {
    /// Assert a durable, non-exclusive, non auto-deleted queue exists
    async fn declare_durable_queue(&self, queue: &str) -> Result<()>;

    /// Start consuming `queue` with manual acknowledgment.
    /// An empty `consumer_tag` lets the broker pick one.
    async fn consume(&self, queue: &str, consumer_tag: &str) -> Result<Box<dyn DeliveryStream>>;

    /// Close the channel. Closing an already closed channel is not an error.
    async fn close(&self) -> Result<()>;
}

/// Stream of deliveries pushed by the broker for one consumer
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeliveryStream: Send {
    /// Wait for the next delivery.
    /// `None` means the broker (or the network) closed the stream.
    async fn next_delivery(&mut self) -> Option<Result<Delivery>>;
}

/// Settles a single delivery on the channel it arrived on
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeliveryAcker: Send + Sync {
    async fn ack(&self) -> Result<()>;

    async fn nack(&self, requeue: bool) -> Result<()>;
}
