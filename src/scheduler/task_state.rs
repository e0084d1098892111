// src/scheduler/task_state.rs

//! Per-task execution slot and the dispatch descriptor.

use crate::engine::TaskName;
use crate::scheduler::burst::BurstId;

/// Execution state of one task.
///
/// `Idle -> Running -> {Idle, RerunPending}`; a `RerunPending` task runs
/// exactly once more when the current run completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Running,
    RerunPending,
}

/// Mutable execution slot for a single task.
#[derive(Debug, Clone)]
pub(crate) struct TaskSlot {
    pub(crate) state: TaskState,
    /// Bursts the in-flight run is executing for.
    pub(crate) owners: Vec<BurstId>,
    /// Bursts waiting for the pending re-run.
    pub(crate) waiters: Vec<BurstId>,
    /// Total runs dispatched for this task.
    pub(crate) runs: u64,
}

impl TaskSlot {
    pub(crate) fn new() -> Self {
        Self {
            state: TaskState::Idle,
            owners: Vec::new(),
            waiters: Vec::new(),
            runs: 0,
        }
    }

    pub(crate) fn start(&mut self, owners: Vec<BurstId>) {
        self.state = TaskState::Running;
        self.owners = owners;
        self.runs += 1;
    }

    /// Record a trigger that arrived while the task was busy.
    pub(crate) fn defer(&mut self, burst: BurstId) {
        self.state = TaskState::RerunPending;
        if !self.waiters.contains(&burst) {
            self.waiters.push(burst);
        }
    }
}

/// Description of a task run the scheduler wants the executor to start now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    /// Monotonically increasing across all runs of all tasks.
    pub run_id: u64,
    /// Bursts this run serves. More than one when a re-run absorbed several
    /// triggers.
    pub bursts: Vec<BurstId>,
}
