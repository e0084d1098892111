// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::reload::ReloadSignal;
use crate::scheduler::ScheduledTask;

use super::core::{BuildSummary, CoreRuntime};
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s, delegates task
/// execution to an `ExecutorBackend` and fires the reload signal.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    reload: Arc<dyn ReloadSignal>,
    initial_build_tx: Option<oneshot::Sender<usize>>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        reload: Arc<dyn ReloadSignal>,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            reload,
            initial_build_tx: None,
        }
    }

    /// Receive the failure count once the initial build finishes.
    pub fn on_initial_build(mut self, tx: oneshot::Sender<usize>) -> Self {
        self.initial_build_tx = Some(tx);
        self
    }

    /// Feed events to the core until it asks to stop or every sender is
    /// gone, executing the commands each step returns.
    pub async fn run(mut self) -> Result<BuildSummary> {
        info!("assetwatch runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime received event");

            let CoreStep {
                commands,
                keep_running,
            } = self.core.step(event);
            for command in commands {
                self.execute_command(command).await?;
            }

            if !keep_running {
                break;
            }
        }

        let summary = self.core.summary();
        info!(
            bursts = summary.bursts,
            task_runs = summary.task_runs,
            task_failures = summary.task_failures,
            "runtime exiting"
        );
        Ok(summary)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                self.spawn_ready(tasks).await?;
            }
            CoreCommand::Reload { burst } => {
                debug!(burst, "firing reload");
                self.reload.notify();
            }
            CoreCommand::InitialBuildComplete { failures } => {
                info!(failures, "initial build complete");
                if let Some(tx) = self.initial_build_tx.take() {
                    let _ = tx.send(failures);
                }
            }
            CoreCommand::RequestExit => debug!("core requested exit"),
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        let run_ids: Vec<_> = tasks.iter().map(|t| t.run_id).collect();
        debug!(?names, ?run_ids, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
