// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of running transforms
//! itself. This makes it easy to swap in a fake executor in tests.
//!
//! - `RealExecutorBackend` spawns one Tokio task per scheduled run, which
//!   awaits the task's transform and reports back on the runtime channel.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were scheduled and directly emits `TaskCompleted` events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::rules::TaskRegistry;
use crate::scheduler::ScheduledTask;
use crate::transform::TransformContext;

use super::task_runner::run_task;

/// Trait abstracting how scheduled tasks are executed.
///
/// Production code uses [`RealExecutorBackend`]; tests can provide their own
/// implementation that doesn't touch the filesystem or spawn processes.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// Every dispatched task must eventually produce exactly one
    /// `RuntimeEvent::TaskCompleted`.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production.
pub struct RealExecutorBackend {
    registry: Arc<TaskRegistry>,
    ctx: Arc<TransformContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl RealExecutorBackend {
    pub fn new(
        registry: Arc<TaskRegistry>,
        ctx: TransformContext,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            registry,
            ctx: Arc::new(ctx),
            runtime_tx,
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for task in tasks {
                tokio::spawn(run_task(
                    task,
                    Arc::clone(&self.registry),
                    Arc::clone(&self.ctx),
                    self.runtime_tx.clone(),
                ));
            }
            Ok(())
        })
    }
}
