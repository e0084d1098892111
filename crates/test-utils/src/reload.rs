use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assetwatch::reload::ReloadSignal;

/// Reload signal that counts notifications.
#[derive(Clone, Default)]
pub struct RecordingReload {
    count: Arc<AtomicUsize>,
}

impl RecordingReload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl ReloadSignal for RecordingReload {
    fn notify(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
