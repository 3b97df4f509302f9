//! Process supervisor for the relay binary.
//!
//! The runner owns the lifecycle of the service:
//! - named app processes run concurrently, sharing one cancellation token
//! - SIGINT / SIGTERM cancel the token for a graceful stop
//! - the first process error cancels the rest and makes the exit status 1
//! - once cancelled, processes get a bounded grace period before being aborted
//!
//! # Example
//!
//! ```no_run
//! use relay_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     Runner::new()
//!         .with_named_process("ticker", |ctx| async move {
//!             while !ctx.is_cancelled() {
//!                 tokio::select! {
//!                     _ = ctx.cancelled() => {}
//!                     _ = tokio::time::sleep(Duration::from_secs(1)) => {
//!                         tracing::info!("tick");
//!                     }
//!                 }
//!             }
//!             Ok(())
//!         })
//!         .with_shutdown_timeout(Duration::from_secs(5))
//!         .run()
//!         .await;
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Future returned by app processes
pub type ProcessFuture = Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>>;

/// A long-running process; it must return once the token is cancelled
pub type AppProcess = Box<dyn FnOnce(CancellationToken) -> ProcessFuture + Send>;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

type Joined = Result<(String, Result<(), anyhow::Error>), JoinError>;

pub struct Runner {
    processes: Vec<(String, AppProcess)>,
    shutdown_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Add a process; its name shows up in the lifecycle logs
    pub fn with_named_process<F, Fut>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.processes.push((
            name.into(),
            Box::new(move |token| -> ProcessFuture { Box::pin(process(token)) }),
        ));
        self
    }

    /// How long processes may take to stop after cancellation. Default is 10 seconds.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Share cancellation with an external owner
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Run until a signal or a process failure, then exit the program.
    ///
    /// Exit status is 0 after a graceful stop and 1 when any process failed.
    pub async fn run(self) {
        spawn_signal_listeners(self.cancellation_token.clone());

        match self.supervise().await {
            Ok(()) => {
                info!("application exiting normally");
                std::process::exit(0);
            }
            Err(err) => {
                error!(error = %format!("{err:#}"), "application exiting with error");
                std::process::exit(1);
            }
        }
    }

    /// Drive processes to completion and report the first process error.
    ///
    /// Returns once every process has stopped, or once the shutdown timeout
    /// has elapsed after cancellation. Unlike [`Runner::run`] this neither
    /// listens for signals nor exits.
    pub async fn supervise(self) -> Result<(), anyhow::Error> {
        let token = self.cancellation_token;
        let mut join_set = JoinSet::new();

        for (name, process) in self.processes {
            let process_token = token.clone();
            info!(process = %name, "starting app process");
            join_set.spawn(async move { (name, process(process_token).await) });
        }

        let mut first_error = None;
        loop {
            tokio::select! {
                joined = join_set.join_next() => match joined {
                    Some(joined) => record(joined, &token, &mut first_error),
                    None => break,
                },
                _ = token.cancelled() => break,
            }
        }

        if !join_set.is_empty() {
            info!(
                remaining = join_set.len(),
                timeout_secs = self.shutdown_timeout.as_secs_f64(),
                "waiting for app processes to stop"
            );

            let drain = async {
                while let Some(joined) = join_set.join_next().await {
                    record(joined, &token, &mut first_error);
                }
            };

            if tokio::time::timeout(self.shutdown_timeout, drain).await.is_err() {
                warn!(
                    remaining = join_set.len(),
                    "app processes did not stop in time, aborting"
                );
                join_set.shutdown().await;
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn record(joined: Joined, token: &CancellationToken, first_error: &mut Option<anyhow::Error>) {
    match joined {
        Ok((name, Ok(()))) => {
            debug!(process = %name, "app process stopped");
        }
        Ok((name, Err(err))) => {
            error!(process = %name, error = %format!("{err:#}"), "app process failed");
            if first_error.is_none() {
                *first_error = Some(err.context(format!("process '{name}' failed")));
            }
            token.cancel();
        }
        Err(err) => {
            error!(error = %err, "app process panicked");
            if first_error.is_none() {
                *first_error = Some(anyhow::anyhow!("app process panicked: {err}"));
            }
            token.cancel();
        }
    }
}

fn spawn_signal_listeners(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received SIGINT, shutting down");
                ctrl_c_token.cancel();
            }
            Err(err) => error!(error = %err, "failed to listen for SIGINT"),
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM, shutting down");
                token.cancel();
            }
            Err(err) => error!(error = %err, "failed to listen for SIGTERM"),
        }
    });
}
