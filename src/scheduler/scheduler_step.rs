// src/scheduler/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::scheduler::burst::{BurstId, FinishedBurst};
use crate::scheduler::task_state::ScheduledTask;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the scheduler and
/// make assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Burst opened by this step, if any. A change merged into an existing
    /// burst opens nothing.
    pub opened: Option<BurstId>,
    /// Runs to start now.
    pub dispatched: Vec<ScheduledTask>,
    /// Bursts that completed or aborted in this step.
    pub finished: Vec<FinishedBurst>,
}

impl SchedulerStep {
    pub fn dispatched_names(&self) -> Vec<&str> {
        self.dispatched.iter().map(|t| t.name.as_str()).collect()
    }
}
