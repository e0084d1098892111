// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{error, info, warn};

use crate::engine::{ChangeEvent, TaskName, TaskOutcome};
use crate::scheduler::{BurstId, BurstKind, ScheduledTask, Scheduler, SchedulerStep};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Notify live-preview clients; one per finished burst.
    Reload { burst: BurstId },
    /// The startup build finished (successfully or not).
    InitialBuildComplete { failures: usize },
    /// Request that the process exits (`--once` when idle, or shutdown
    /// once drained).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute (send tasks, reload, exit).
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn dispatched(&self) -> Vec<&ScheduledTask> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn reloads(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, CoreCommand::Reload { .. }))
            .count()
    }
}

pub fn handle_initial_build(scheduler: &mut Scheduler) -> SchedulerStep {
    scheduler.start_initial_build()
}

pub fn handle_file_change(scheduler: &mut Scheduler, event: &ChangeEvent) -> SchedulerStep {
    scheduler.handle_change(event)
}

/// Log the outcome and feed it to the scheduler.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    task: &TaskName,
    outcome: &TaskOutcome,
) -> SchedulerStep {
    if let TaskOutcome::Failed(reason) = outcome {
        error!(task = %task, error = %reason, "task failed");
    }
    scheduler.handle_completion(task, outcome)
}

/// Translate a scheduler step into shell commands.
///
/// Also returns the failure count of the initial build if it finished in
/// this step.
pub fn commands_for(step: SchedulerStep) -> (Vec<CoreCommand>, Option<usize>) {
    let mut commands = Vec::new();
    let mut initial_failures = None;

    if !step.dispatched.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.dispatched));
    }

    for finished in step.finished {
        if finished.failures.is_empty() {
            info!(
                burst = finished.id,
                tasks = finished.chain.len(),
                triggers = ?finished.triggers,
                "build finished"
            );
        } else {
            warn!(
                burst = finished.id,
                failed = ?finished.failures,
                aborted = finished.aborted,
                "build finished with failures"
            );
        }
        if finished.kind == BurstKind::InitialBuild {
            initial_failures = Some(finished.failures.len());
        }
        commands.push(CoreCommand::Reload { burst: finished.id });
    }

    if let Some(failures) = initial_failures {
        commands.push(CoreCommand::InitialBuildComplete { failures });
    }

    (commands, initial_failures)
}
