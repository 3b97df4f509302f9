use std::fmt;
use thiserror::Error;

/// Step of the broker session that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Connect,
    OpenChannel,
    DeclareQueue,
    StartConsumer,
    Consume,
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Connect => "connect",
            Self::OpenChannel => "channel open",
            Self::DeclareQueue => "queue declare",
            Self::StartConsumer => "consumer start",
            Self::Consume => "consume",
        };
        f.write_str(stage)
    }
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("missing required configuration: {0}")]
    MissingConfig(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("broker session failed during {stage}: {source:#}")]
    Session {
        stage: SessionStage,
        #[source]
        source: anyhow::Error,
    },
}

impl RelayError {
    pub fn session(stage: SessionStage, source: anyhow::Error) -> Self {
        Self::Session { stage, source }
    }

    /// Session failures are retried forever; configuration errors never are
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Session { .. })
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
