// src/exec/task_runner.rs

//! Individual task runner.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::rules::TaskRegistry;
use crate::scheduler::ScheduledTask;
use crate::transform::TransformContext;

/// Run one scheduled task's transform and report a `TaskCompleted` event.
///
/// Transform failures become `TaskOutcome::Failed`; they never escape this
/// boundary.
pub async fn run_task(
    task: ScheduledTask,
    registry: Arc<TaskRegistry>,
    ctx: Arc<TransformContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let started = Instant::now();

    let outcome = match registry.get(&task.name) {
        Some(entry) => {
            info!(task = %task.name, run_id = task.run_id, "task started");
            match entry.run(&ctx).await {
                Ok(report) => {
                    info!(
                        task = %task.name,
                        run_id = task.run_id,
                        written = report.written,
                        skipped = report.skipped,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "task finished"
                    );
                    TaskOutcome::Success
                }
                Err(err) => TaskOutcome::Failed(err.to_string()),
            }
        }
        None => TaskOutcome::Failed(format!("task '{}' is not registered", task.name)),
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        warn!(task = %task.name, run_id = task.run_id, "runtime gone; dropping completion");
    }
}
