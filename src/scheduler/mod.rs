// src/scheduler/mod.rs

//! Incremental scheduling.
//!
//! - [`scheduler`] contains the state machine that turns change events
//!   into task runs and finished bursts.
//! - [`burst`] models one triggered chain and its reload.
//! - [`task_state`] holds the per-task slot and the dispatch descriptor.
//! - [`scheduler_step`] defines the result type for scheduler steps.

pub mod burst;
#[allow(clippy::module_inception)]
pub mod scheduler;
pub mod scheduler_step;
pub mod task_state;

pub use burst::{BurstId, BurstKind, ChainPolicy, FinishedBurst};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_state::{ScheduledTask, TaskState};
