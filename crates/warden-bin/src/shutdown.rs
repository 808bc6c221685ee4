// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Stopping the gateway.
//!
//! A [`ShutdownCoordinator`] holds a `watch` channel that flips once, from
//! running to stopping, and remembers what stopped it. SIGTERM, SIGINT and
//! [`ShutdownCoordinator::initiate_shutdown`] all end up there.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// What stopped the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// An OS signal, by name.
    Signal(&'static str),
    /// A call to [`ShutdownCoordinator::initiate_shutdown`].
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "received {name}"),
            Self::Requested => f.write_str("requested"),
        }
    }
}

/// Cloneable handle shared by the server task and the signal listener.
///
/// ```ignore
/// let shutdown = ShutdownCoordinator::new();
/// tokio::spawn(shutdown.clone().listen_for_signals());
/// server.run_with_shutdown(shutdown.shutdown_signal()).await?;
/// ```
#[derive(Clone)]
pub struct ShutdownCoordinator {
    state: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl ShutdownCoordinator {
    /// A coordinator in the running state.
    pub fn new() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(None)),
        }
    }

    /// Resolves once shutdown starts, or at once if it already has.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.state.subscribe();
        async move {
            // The sender lives in `self`; an error means every handle is gone.
            let _ = rx.wait_for(Option::is_some).await;
        }
    }

    /// Stops the gateway. Later calls are no-ops.
    pub fn initiate_shutdown(&self) {
        self.stop(ShutdownReason::Requested);
    }

    /// `true` once shutdown has started.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Why shutdown started, if it has.
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.state.borrow()
    }

    /// Waits for SIGTERM or SIGINT, then stops the gateway.
    ///
    /// Returns without waiting further if shutdown starts some other way.
    pub async fn listen_for_signals(self) -> std::io::Result<()> {
        let stopped = self.shutdown_signal();
        tokio::select! {
            name = os_signal() => self.stop(ShutdownReason::Signal(name?)),
            () = stopped => {}
        }
        Ok(())
    }

    fn stop(&self, reason: ShutdownReason) {
        let first = self.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(reason);
            true
        });
        if first {
            info!(%reason, "Shutdown initiated");
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(unix)]
async fn os_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    Ok(tokio::select! {
        _ = term.recv() => "SIGTERM",
        _ = int.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn os_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl+C")
}
