//! Signal handling for graceful shutdown

use tracing::{debug, warn};

/// Handles shutdown signals (Ctrl-C, plus SIGTERM or console close)
pub struct ShutdownSignal;

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self
    }

    /// Wait for a shutdown signal
    pub async fn wait(&self) {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => debug!("received Ctrl-C"),
                Err(e) => {
                    warn!(%e, "failed to listen for Ctrl-C");
                    terminate().await;
                }
            },
            _ = terminate() => {}
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
            debug!("received SIGTERM");
        }
        Err(e) => {
            warn!(%e, "failed to register SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(windows)]
async fn terminate() {
    match tokio::signal::windows::ctrl_close() {
        Ok(mut close) => {
            close.recv().await;
            debug!("received console close");
        }
        Err(e) => {
            warn!(%e, "failed to register console close handler");
            std::future::pending::<()>().await;
        }
    }
}
