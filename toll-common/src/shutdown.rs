//! Graceful shutdown shared by every listener of a process.
//!
//! One [`CancellationToken`] is the process-wide shutdown signal. Each listener
//! runs under [`Listener::supervise`], which walks the listener through
//! `Starting -> Serving -> Draining -> Stopped`:
//!
//! - the token being cancelled (signal, or a sibling listener failing) moves it
//!   to `Draining`; the server, built with the same token as its graceful
//!   shutdown trigger, stops accepting and finishes in-flight requests;
//! - a server that exits on its own is a fatal error: it cancels the token so
//!   every other listener drains too;
//! - draining is bounded, after the timeout the server task is aborted and the
//!   listener reports `Stopped`; connections still open go away with the runtime.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::signal;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerState {
    Starting,
    Serving,
    Draining,
    Stopped,
}

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("{listener} listener failed: {reason}")]
    Failed {
        listener: &'static str,
        reason: String,
    },
    #[error("{listener} listener stopped without a shutdown request")]
    Exited { listener: &'static str },
    #[error("{listener} listener panicked")]
    Panicked { listener: &'static str },
}

/// Completes when SIGTERM or SIGINT is received.
pub async fn shutdown_signal() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    info!("received shutdown signal, shutting down gracefully");
}

/// Cancel `token` on the first SIGTERM or SIGINT.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => token.cancel(),
            _ = token.cancelled() => {},
        }
    });
}

pub struct Listener {
    name: &'static str,
    state: watch::Sender<ListenerState>,
}

impl Listener {
    pub fn new(name: &'static str) -> Self {
        let (state, _) = watch::channel(ListenerState::Starting);
        Self { name, state }
    }

    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    /// Run `server` until it is drained.
    ///
    /// `server` must stop accepting and resolve once `shutdown` is cancelled.
    pub async fn supervise<F, E>(
        self,
        server: F,
        shutdown: CancellationToken,
        drain_timeout: Duration,
    ) -> Result<(), ServeError>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let name = self.name;
        let mut task = tokio::spawn(server);
        self.state.send_replace(ListenerState::Serving);
        info!(listener = name, "listener serving");

        // Cancellation is checked first: a server stopping because of it is
        // ready in the same poll and must not be taken for an unrequested exit.
        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                self.state.send_replace(ListenerState::Draining);
                info!(listener = name, ?drain_timeout, "listener draining");

                match tokio::time::timeout(drain_timeout, &mut task).await {
                    Ok(Ok(Ok(()))) => Ok(()),
                    Ok(Ok(Err(err))) => Err(ServeError::Failed {
                        listener: name,
                        reason: err.to_string(),
                    }),
                    Ok(Err(_)) => Err(ServeError::Panicked { listener: name }),
                    Err(_) => {
                        warn!(listener = name, "drain timeout expired, closing remaining connections");
                        task.abort();
                        drop(task.await);
                        Ok(())
                    }
                }
            }
            joined = &mut task => {
                let requested = shutdown.is_cancelled();
                // Whatever the reason, a listener going away takes the process down.
                shutdown.cancel();
                self.state.send_replace(ListenerState::Draining);
                match joined {
                    Ok(Ok(())) if requested => Ok(()),
                    Ok(Ok(())) => Err(ServeError::Exited { listener: name }),
                    Ok(Err(err)) => Err(ServeError::Failed {
                        listener: name,
                        reason: err.to_string(),
                    }),
                    Err(_) => Err(ServeError::Panicked { listener: name }),
                }
            }
        };

        if let Err(err) = &result {
            error!(listener = name, "{}", err);
        }
        self.state.send_replace(ListenerState::Stopped);
        info!(listener = name, "listener stopped");

        result
    }
}
