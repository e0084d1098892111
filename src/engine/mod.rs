// src/engine/mod.rs

//! Orchestration engine for assetwatch.
//!
//! This module ties together:
//! - the incremental scheduler
//! - the main runtime event loop that reacts to:
//!   - the initial build request
//!   - file changes forwarded by the notifier
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::SystemTime;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a single transform run, as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Carries the rendered error for logging.
    Failed(String),
}

/// A single observed mutation under the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Root-relative path with `/` separators.
    pub path: String,
    pub timestamp: SystemTime,
}

impl ChangeEvent {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            timestamp: SystemTime::now(),
        }
    }
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once the scheduler is idle after the
    /// initial build (used for `--once`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the orchestrator, the watcher and
/// the executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Run every registered task once.
    InitialBuildRequested,
    /// A watched path changed.
    FileChanged(ChangeEvent),
    /// A transform run finished.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::{BuildSummary, CoreRuntime};
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
