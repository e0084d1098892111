use std::path::Path;
use std::sync::{Arc, Mutex};

use assetwatch::engine::{ChangeEvent, RuntimeEvent};
use assetwatch::errors::{AssetwatchError, Result};
use assetwatch::rules::TaskRegistry;
use assetwatch::watch::{ChangeNotifier, WatchHandle};
use tokio::sync::mpsc;

/// Change notifier driven by the test instead of the filesystem.
#[derive(Clone, Default)]
pub struct ManualNotifier {
    sender: Arc<Mutex<Option<mpsc::Sender<RuntimeEvent>>>>,
    fail: bool,
}

impl ManualNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose `arm` always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn is_armed(&self) -> bool {
        self.sender.lock().unwrap().is_some()
    }

    /// Emit a change for `path` (root-relative).
    pub async fn change(&self, path: &str) {
        let tx = self
            .sender
            .lock()
            .unwrap()
            .clone()
            .expect("notifier not armed");
        tx.send(RuntimeEvent::FileChanged(ChangeEvent::new(path)))
            .await
            .expect("runtime gone");
    }
}

impl ChangeNotifier for ManualNotifier {
    fn arm(
        &self,
        _root: &Path,
        _registry: Arc<TaskRegistry>,
        events: mpsc::Sender<RuntimeEvent>,
    ) -> Result<WatchHandle> {
        if self.fail {
            return Err(AssetwatchError::StartupError(
                "watcher unavailable".to_string(),
            ));
        }
        *self.sender.lock().unwrap() = Some(events);
        Ok(WatchHandle::inert())
    }
}
