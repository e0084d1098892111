// src/watch/watcher.rs

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::{AssetwatchError, Result};
use crate::rules::TaskRegistry;
use crate::watch::event_handler::{forward_events, Debouncer};
use crate::watch::{ChangeNotifier, WatchHandle};

/// Change notifier backed by the platform's recursive file watcher.
#[derive(Debug, Clone, Default)]
pub struct NotifyWatcher {
    debounce: Duration,
}

impl NotifyWatcher {
    pub fn new(debounce: Duration) -> Self {
        Self { debounce }
    }
}

impl ChangeNotifier for NotifyWatcher {
    fn arm(
        &self,
        root: &Path,
        registry: Arc<TaskRegistry>,
        events: mpsc::Sender<RuntimeEvent>,
    ) -> Result<WatchHandle> {
        // Canonicalize once so we have a stable base path.
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

        // Channel from the blocking notify callback into the async world.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event_tx.send(event).is_err() {
                        debug!("watch forwarder gone; dropping notify event");
                    }
                }
                Err(err) => warn!(error = %err, "file watch error"),
            },
            Config::default(),
        )
        .map_err(|e| AssetwatchError::StartupError(format!("creating file watcher: {e}")))?;

        watcher.watch(&root, RecursiveMode::Recursive).map_err(|e| {
            AssetwatchError::StartupError(format!("watching {:?}: {e}", root))
        })?;

        info!(root = ?root, debounce_ms = self.debounce.as_millis() as u64, "file watcher started");

        let debouncer = Debouncer::new(self.debounce);
        let forwarder = tokio::spawn(async move {
            forward_events(&root, event_rx, &registry, debouncer, events).await;
        });

        Ok(WatchHandle::new(watcher, forwarder))
    }
}
