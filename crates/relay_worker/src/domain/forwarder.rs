use crate::domain::ObservationRecord;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForwardError {
    /// The request could not be constructed (bad endpoint, bad header value, encoding)
    #[error("failed to build request: {0}")]
    Build(String),

    /// The request was not answered (refused, reset, timed out)
    #[error("request failed: {0}")]
    Transport(String),
}

/// Delivers observation records to the ingestion backend
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ObservationForwarder: Send + Sync {
    /// Send one record and return the HTTP status code the backend answered with
    async fn forward(&self, record: &ObservationRecord) -> Result<u16, ForwardError>;
}
