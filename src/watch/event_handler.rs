// src/watch/event_handler.rs

//! Event processing logic for file system changes.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use notify::{Event, EventKind};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::engine::{ChangeEvent, RuntimeEvent};
use crate::rules::TaskRegistry;
use crate::watch::path_utils::relative_str;

/// Trailing-edge debounce per path.
///
/// Editors often emit several events for one save. A path is held until its
/// window passes without another event for it, then released once, so the
/// last event of a burst of saves is always forwarded. With a zero window
/// nothing is held.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<String, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Record an event for `path` seen at `now`.
    ///
    /// Returns `true` when the path should be forwarded right away (zero
    /// window). Otherwise the path's deadline is pushed to `now + window`.
    pub fn hold(&mut self, path: &str, now: Instant) -> bool {
        if self.window.is_zero() {
            return true;
        }
        self.pending.insert(path.to_string(), now + self.window);
        false
    }

    /// Earliest deadline among held paths.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Release every path whose window has passed, in path order.
    pub fn take_due(&mut self, now: Instant) -> Vec<String> {
        let mut due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &due {
            self.pending.remove(path);
        }
        due.sort();
        due
    }

    /// Release everything still held.
    pub fn take_all(&mut self) -> Vec<String> {
        let mut all: Vec<String> = self.pending.drain().map(|(path, _)| path).collect();
        all.sort();
        all
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

async fn send_change(rel: String, runtime_tx: &mpsc::Sender<RuntimeEvent>) -> bool {
    match runtime_tx
        .send(RuntimeEvent::FileChanged(ChangeEvent::new(rel)))
        .await
    {
        Ok(()) => true,
        Err(err) => {
            warn!("failed to send RuntimeEvent::FileChanged: {err}");
            false
        }
    }
}

/// Forward the relevant paths of one notify event to the runtime, or hold
/// them in `debouncer`.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_notify_event(
    root: &Path,
    event: Event,
    registry: &TaskRegistry,
    debouncer: &mut Debouncer,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return true;
    }

    for path in &event.paths {
        let Some(rel) = relative_str(root, path) else {
            debug!(?path, "event outside project root; ignoring");
            continue;
        };

        let Some(task) = registry.find(&rel) else {
            continue;
        };

        if !debouncer.hold(&rel, Instant::now()) {
            debug!(path = %rel, task = %task.id(), "held for debounce");
            continue;
        }

        debug!(path = %rel, task = %task.id(), kind = ?event.kind, "forwarding change");
        if !send_change(rel, runtime_tx).await {
            return false;
        }
    }
    true
}

/// Forward every held path whose window has passed by `now`.
///
/// Returns `false` once the runtime channel is closed.
pub async fn flush_due(
    debouncer: &mut Debouncer,
    now: Instant,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    for rel in debouncer.take_due(now) {
        debug!(path = %rel, "forwarding debounced change");
        if !send_change(rel, runtime_tx).await {
            return false;
        }
    }
    true
}

/// Forwarder loop between the notify callback and the runtime.
///
/// Runs until either channel closes. Paths still held when the notify side
/// closes are forwarded before returning.
pub async fn forward_events(
    root: &Path,
    mut event_rx: mpsc::UnboundedReceiver<Event>,
    registry: &TaskRegistry,
    mut debouncer: Debouncer,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    loop {
        let deadline = debouncer.next_deadline();
        tokio::select! {
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else {
                    for rel in debouncer.take_all() {
                        if !send_change(rel, &runtime_tx).await {
                            break;
                        }
                    }
                    break;
                };
                if !process_notify_event(root, event, registry, &mut debouncer, &runtime_tx).await {
                    break;
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if !flush_due(&mut debouncer, Instant::now(), &runtime_tx).await {
                    break;
                }
            }
        }
    }
    debug!("watcher event loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_window_forwards_immediately() {
        let mut d = Debouncer::new(Duration::ZERO);
        let now = Instant::now();
        assert!(d.hold("a", now));
        assert!(d.hold("a", now));
        assert!(d.is_empty());
    }

    #[test]
    fn repeats_push_the_deadline_back() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let t0 = Instant::now();
        assert!(!d.hold("src/a.js", t0));
        assert!(!d.hold("src/a.js", t0 + Duration::from_millis(50)));
        assert!(!d.hold("src/b.js", t0 + Duration::from_millis(60)));

        // a's first deadline has passed, but the second save moved it.
        assert!(d.take_due(t0 + Duration::from_millis(120)).is_empty());
        assert_eq!(d.next_deadline(), Some(t0 + Duration::from_millis(150)));

        assert_eq!(d.take_due(t0 + Duration::from_millis(150)), vec!["src/a.js"]);
        assert_eq!(d.take_due(t0 + Duration::from_millis(160)), vec!["src/b.js"]);
        assert!(d.is_empty());
    }

    #[test]
    fn take_all_releases_everything_sorted() {
        let mut d = Debouncer::new(Duration::from_secs(60));
        let now = Instant::now();
        d.hold("src/z.js", now);
        d.hold("src/a.js", now);
        assert_eq!(d.take_all(), vec!["src/a.js", "src/z.js"]);
        assert_eq!(d.next_deadline(), None);
    }
}
