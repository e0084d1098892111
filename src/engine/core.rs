// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - firing the reload signal
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use tracing::info;

use crate::engine::event_handlers::{
    commands_for, handle_file_change, handle_initial_build, handle_task_completion, CoreCommand,
    CoreStep,
};
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskOutcome};
use crate::scheduler::Scheduler;

/// Counters accumulated over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Bursts that finished (one reload each).
    pub bursts: usize,
    pub task_runs: usize,
    pub task_failures: usize,
}

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    options: RuntimeOptions,
    summary: BuildSummary,
    initial_build_done: bool,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, options: RuntimeOptions) -> Self {
        Self {
            scheduler,
            options,
            summary: BuildSummary::default(),
            initial_build_done: false,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn summary(&self) -> BuildSummary {
        self.summary
    }

    /// Expose whether the scheduler is idle (for tests).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        let step = match event {
            RuntimeEvent::InitialBuildRequested => handle_initial_build(&mut self.scheduler),
            RuntimeEvent::FileChanged(change) => handle_file_change(&mut self.scheduler, &change),
            RuntimeEvent::TaskCompleted { task, outcome } => {
                if let TaskOutcome::Failed(_) = outcome {
                    self.summary.task_failures += 1;
                }
                handle_task_completion(&mut self.scheduler, &task, &outcome)
            }
            RuntimeEvent::ShutdownRequested => {
                self.scheduler.begin_shutdown();
                Default::default()
            }
        };

        self.summary.task_runs += step.dispatched.len();
        self.summary.bursts += step.finished.len();

        let (mut commands, initial) = commands_for(step);
        if initial.is_some() {
            self.initial_build_done = true;
        }

        let keep_running = !self.should_exit();
        if !keep_running {
            info!(summary = ?self.summary, "runtime idle; requesting exit");
            commands.push(CoreCommand::RequestExit);
        }

        CoreStep {
            commands,
            keep_running,
        }
    }

    fn should_exit(&self) -> bool {
        if !self.scheduler.is_idle() {
            return false;
        }
        self.scheduler.is_draining() || (self.options.exit_when_idle && self.initial_build_done)
    }
}
