#![allow(dead_code)]

pub use assetwatch_test_utils::builders;
pub use assetwatch_test_utils::init_tracing;

use assetwatch::engine::{ChangeEvent, TaskOutcome};
use assetwatch::scheduler::{FinishedBurst, Scheduler, SchedulerStep};

pub fn change(path: &str) -> ChangeEvent {
    ChangeEvent::new(path)
}

/// Complete every dispatched run successfully (or per `fails`), following
/// re-dispatches, until nothing more is dispatched.
///
/// Returns task names in the order they ran and every finished burst.
pub fn drive(
    scheduler: &mut Scheduler,
    first: SchedulerStep,
    fails: &[&str],
) -> (Vec<String>, Vec<FinishedBurst>) {
    let mut ran = Vec::new();
    let mut finished = first.finished;
    let mut pending = first.dispatched;

    while !pending.is_empty() {
        let task = pending.remove(0);
        ran.push(task.name.clone());
        let outcome = if fails.contains(&task.name.as_str()) {
            TaskOutcome::Failed("boom".to_string())
        } else {
            TaskOutcome::Success
        };
        let step = scheduler.handle_completion(&task.name, &outcome);
        pending.extend(step.dispatched);
        finished.extend(step.finished);
    }

    (ran, finished)
}
