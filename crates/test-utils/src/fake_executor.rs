use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetwatch::engine::{RuntimeEvent, TaskOutcome};
use assetwatch::errors::Result;
use assetwatch::exec::ExecutorBackend;
use assetwatch::scheduler::ScheduledTask;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - immediately reports `TaskCompleted` for each scheduled task, failing
///   the ones listed in `failing`.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    pub fn failing<'a>(mut self, tasks: impl IntoIterator<Item = &'a str>) -> Self {
        self.failing.extend(tasks.into_iter().map(str::to_string));
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for t in tasks {
                executed.lock().unwrap().push(t.name.clone());

                let outcome = if failing.contains(&t.name) {
                    TaskOutcome::Failed(format!("{} failed on purpose", t.name))
                } else {
                    TaskOutcome::Success
                };

                // Complete from a separate task: the runtime is the one
                // awaiting this future, so a full channel must not block it.
                let tx = tx.clone();
                tokio::spawn(async move {
                    let _ = tx
                        .send(RuntimeEvent::TaskCompleted {
                            task: t.name,
                            outcome,
                        })
                        .await;
                });
            }
            Ok(())
        })
    }
}

/// An executor that records dispatches and never completes them; tests
/// send `TaskCompleted` themselves.
#[derive(Clone, Default)]
pub struct ManualExecutor {
    pub dispatched: Arc<Mutex<Vec<ScheduledTask>>>,
}

impl ManualExecutor {
    pub fn names(&self) -> Vec<String> {
        self.dispatched
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.name.clone())
            .collect()
    }
}

impl ExecutorBackend for ManualExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.dispatched.lock().unwrap().extend(tasks);
        Box::pin(async { Ok(()) })
    }
}
