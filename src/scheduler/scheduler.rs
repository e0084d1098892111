// src/scheduler/scheduler.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::engine::{ChangeEvent, TaskName, TaskOutcome};
use crate::rules::{ChainTable, TaskRegistry};
use crate::scheduler::burst::{Burst, BurstId, BurstKind, BurstState, ChainPolicy};
use crate::scheduler::scheduler_step::SchedulerStep;
use crate::scheduler::task_state::{ScheduledTask, TaskSlot, TaskState};

/// Incremental scheduler.
///
/// Holds the immutable task registry and chain table plus the mutable
/// per-task slots and open bursts. It is responsible for:
/// - resolving a changed path to its owning task and chain
/// - running each burst's chain sequentially
/// - never running a task twice at once, coalescing triggers for a busy
///   task into a single re-run
/// - reporting each finished burst exactly once
///
/// It performs no IO; callers feed it events and act on the returned
/// [`SchedulerStep`].
#[derive(Debug)]
pub struct Scheduler {
    registry: Arc<TaskRegistry>,
    chains: ChainTable,
    slots: HashMap<TaskName, TaskSlot>,
    bursts: BTreeMap<BurstId, Burst>,
    next_burst: BurstId,
    next_run: u64,
    draining: bool,
}

impl Scheduler {
    pub fn new(registry: Arc<TaskRegistry>, chains: ChainTable) -> Self {
        let slots = registry
            .ids()
            .map(|id| (id.to_string(), TaskSlot::new()))
            .collect();
        Self {
            registry,
            chains,
            slots,
            bursts: BTreeMap::new(),
            next_burst: 1,
            next_run: 1,
            draining: false,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// No task is running and no burst is open.
    pub fn is_idle(&self) -> bool {
        self.bursts.is_empty() && self.slots.values().all(|s| s.state == TaskState::Idle)
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    pub fn task_state(&self, task: &str) -> Option<TaskState> {
        self.slots.get(task).map(|s| s.state)
    }

    /// Total runs dispatched for `task` so far.
    pub fn runs_of(&self, task: &str) -> Option<u64> {
        self.slots.get(task).map(|s| s.runs)
    }

    pub fn open_bursts(&self) -> usize {
        self.bursts.len()
    }

    /// Open the startup burst over every registered task, in registry order.
    /// Failures do not stop the remaining tasks.
    pub fn start_initial_build(&mut self) -> SchedulerStep {
        let mut step = SchedulerStep::default();
        if self.draining {
            return step;
        }

        let chain: Vec<TaskName> = self.registry.ids().map(str::to_string).collect();
        info!(tasks = chain.len(), "starting initial build");

        let id = self.open_burst(BurstKind::InitialBuild, ChainPolicy::ContinueOnFailure, chain);
        step.opened = Some(id);
        self.advance(id, &mut step);
        step
    }

    /// React to one change event.
    pub fn handle_change(&mut self, event: &ChangeEvent) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        if self.draining {
            debug!(path = %event.path, "shutting down; ignoring change");
            return step;
        }

        let (task, chain) = match self.registry.find(&event.path) {
            Some(task) => (task.id().to_string(), self.chains.chain_for(task)),
            None => {
                debug!(path = %event.path, "no rule owns path; ignoring");
                return step;
            }
        };
        let Some(first) = chain.first().cloned() else {
            return step;
        };

        if let Some(burst) = self
            .bursts
            .values_mut()
            .find(|b| b.kind == BurstKind::Change && b.is_queued() && b.current() == Some(first.as_str()))
        {
            debug!(
                path = %event.path,
                task = %task,
                burst = burst.id,
                "merging change into queued burst"
            );
            burst.absorb(&chain, event.path.clone());
            return step;
        }

        let id = self.open_burst(BurstKind::Change, ChainPolicy::AbortOnFailure, chain);
        if let Some(burst) = self.bursts.get_mut(&id) {
            burst.triggers.push(event.path.clone());
        }
        debug!(path = %event.path, task = %task, burst = id, "opened burst");

        step.opened = Some(id);
        self.advance(id, &mut step);
        step
    }

    /// React to a finished run of `task`.
    pub fn handle_completion(&mut self, task: &str, outcome: &TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(slot) = self.slots.get_mut(task) else {
            warn!(task, "completion for unknown task");
            return step;
        };
        if slot.state == TaskState::Idle {
            warn!(task, "completion for a task that is not running");
            return step;
        }

        let owners = std::mem::take(&mut slot.owners);
        let waiters = std::mem::take(&mut slot.waiters);
        slot.state = TaskState::Idle;

        // One re-run serves every burst that queued up behind this run.
        if !waiters.is_empty() {
            let run_id = self.next_run_id();
            debug!(task, run_id, bursts = ?waiters, "dispatching coalesced re-run");
            for id in &waiters {
                if let Some(burst) = self.bursts.get_mut(id) {
                    burst.state = BurstState::Running;
                }
            }
            if let Some(slot) = self.slots.get_mut(task) {
                slot.start(waiters.clone());
            }
            step.dispatched.push(ScheduledTask {
                name: task.to_string(),
                run_id,
                bursts: waiters,
            });
        }

        for id in owners {
            let Some(burst) = self.bursts.get_mut(&id) else {
                continue;
            };

            match outcome {
                TaskOutcome::Success => burst.cursor += 1,
                TaskOutcome::Failed(_) => {
                    burst.failures.push(task.to_string());
                    let policy = burst.policy;
                    match policy {
                        ChainPolicy::AbortOnFailure => {
                            burst.aborted = true;
                            info!(
                                burst = id,
                                task,
                                skipped = burst.chain.len() - burst.cursor - 1,
                                "task failed; aborting the rest of its chain"
                            );
                            if let Some(burst) = self.bursts.remove(&id) {
                                step.finished.push(burst.finish());
                            }
                            continue;
                        }
                        ChainPolicy::ContinueOnFailure => burst.cursor += 1,
                    }
                }
            }

            self.advance(id, &mut step);
        }

        step
    }

    /// Stop accepting work: drop queued bursts and pending re-runs, let
    /// in-flight runs finish without reporting any further bursts.
    pub fn begin_shutdown(&mut self) {
        if self.draining {
            return;
        }
        self.draining = true;

        let dropped = self.bursts.len();
        self.bursts.clear();
        for slot in self.slots.values_mut() {
            slot.owners.clear();
            slot.waiters.clear();
            if slot.state == TaskState::RerunPending {
                slot.state = TaskState::Running;
            }
        }

        let in_flight = self
            .slots
            .values()
            .filter(|s| s.state != TaskState::Idle)
            .count();
        info!(dropped_bursts = dropped, in_flight, "scheduler draining");
    }

    fn open_burst(&mut self, kind: BurstKind, policy: ChainPolicy, chain: Vec<TaskName>) -> BurstId {
        let id = self.next_burst;
        self.next_burst += 1;
        self.bursts.insert(id, Burst::new(id, kind, policy, chain));
        id
    }

    fn next_run_id(&mut self) -> u64 {
        let id = self.next_run;
        self.next_run += 1;
        id
    }

    /// Move burst `id` forward until it dispatches, waits, or finishes.
    fn advance(&mut self, id: BurstId, step: &mut SchedulerStep) {
        loop {
            let Some(burst) = self.bursts.get_mut(&id) else {
                return;
            };

            let Some(name) = burst.current().map(str::to_string) else {
                if let Some(burst) = self.bursts.remove(&id) {
                    debug!(burst = id, failures = burst.failures.len(), "burst finished");
                    step.finished.push(burst.finish());
                }
                return;
            };

            let Some(slot) = self.slots.get_mut(&name) else {
                warn!(burst = id, task = %name, "chain names an unregistered task; skipping");
                burst.cursor += 1;
                continue;
            };

            match slot.state {
                TaskState::Idle => {
                    burst.state = BurstState::Running;
                    slot.start(vec![id]);
                    let run_id = self.next_run;
                    self.next_run += 1;
                    step.dispatched.push(ScheduledTask {
                        name,
                        run_id,
                        bursts: vec![id],
                    });
                }
                TaskState::Running | TaskState::RerunPending => {
                    burst.state = BurstState::Waiting;
                    slot.defer(id);
                    debug!(burst = id, task = %name, "task busy; re-run pending");
                }
            }
            return;
        }
    }
}
