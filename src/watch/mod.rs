// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module wires up a cross-platform filesystem watcher (`notify`) and
//! turns raw events into root-relative [`ChangeEvent`]s for paths that some
//! rule owns.
//!
//! It does **not** decide what to build; the scheduler re-resolves every
//! event against the registry.
//!
//! [`ChangeEvent`]: crate::engine::ChangeEvent

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::rules::TaskRegistry;

pub mod event_handler;
pub mod path_utils;
pub mod watcher;

pub use event_handler::Debouncer;
pub use watcher::NotifyWatcher;

/// Source of change events for a project root.
pub trait ChangeNotifier: Send + Sync {
    /// Start watching `root`, sending a `RuntimeEvent::FileChanged` for every
    /// change to a path `registry` resolves.
    fn arm(
        &self,
        root: &Path,
        registry: Arc<TaskRegistry>,
        events: mpsc::Sender<RuntimeEvent>,
    ) -> Result<WatchHandle>;
}

/// Keeps a watch alive. Dropping it stops watching.
#[derive(Default)]
pub struct WatchHandle {
    watcher: Option<RecommendedWatcher>,
    forwarder: Option<JoinHandle<()>>,
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

impl WatchHandle {
    pub fn new(watcher: RecommendedWatcher, forwarder: JoinHandle<()>) -> Self {
        Self {
            watcher: Some(watcher),
            forwarder: Some(forwarder),
        }
    }

    /// A handle with nothing behind it, for notifiers that manage their own
    /// event source.
    pub fn inert() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.watcher.is_some() || self.forwarder.is_some()
    }

    /// Stop watching now.
    pub fn stop(&mut self) {
        if self.watcher.take().is_some() {
            debug!("file watcher stopped");
        }
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
