// src/reload/mod.rs

//! Live reload.
//!
//! The runtime fires a [`ReloadSignal`] once per finished burst. The
//! production signal is [`LiveReload`], a broadcast channel the preview
//! server's WebSocket clients subscribe to. [`server`] hosts the files and
//! the client endpoint.

use std::fmt;

use tokio::sync::broadcast;
use tracing::debug;

pub mod server;

pub use server::{serve, ServeOptions, ServerHandle};

/// Message pushed to every connected client.
pub const RELOAD_MESSAGE: &str = "reload";

/// Fire-and-forget notification to live-preview clients.
pub trait ReloadSignal: Send + Sync {
    /// Never blocks and never fails; a no-op without clients.
    fn notify(&self);
}

impl fmt::Debug for dyn ReloadSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReloadSignal")
    }
}

/// Signal used when nothing is listening (`--once`, `--no-serve`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReload;

impl ReloadSignal for NoopReload {
    fn notify(&self) {}
}

/// Broadcasts reloads to subscribed WebSocket clients.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<()>,
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Number of connected clients.
    pub fn clients(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadSignal for LiveReload {
    fn notify(&self) {
        // Err only means nobody is connected.
        match self.tx.send(()) {
            Ok(n) => debug!(clients = n, "reload sent"),
            Err(_) => debug!("reload skipped; no clients"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_without_clients_is_a_no_op() {
        let reload = LiveReload::new();
        assert_eq!(reload.clients(), 0);
        reload.notify();
    }

    #[tokio::test]
    async fn subscribers_receive_each_reload() {
        let reload = LiveReload::new();
        let mut rx = reload.subscribe();
        assert_eq!(reload.clients(), 1);

        reload.notify();
        reload.notify();
        assert!(rx.recv().await.is_ok());
        assert!(rx.recv().await.is_ok());
    }
}
