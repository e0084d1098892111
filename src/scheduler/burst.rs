// src/scheduler/burst.rs

//! Bursts: one triggered chain of tasks and its reload.

use crate::engine::TaskName;

pub type BurstId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstKind {
    /// The startup build over every registered task.
    InitialBuild,
    /// Triggered by a file change.
    Change,
}

/// What a failed task does to the rest of its burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPolicy {
    AbortOnFailure,
    ContinueOnFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BurstState {
    /// Its current task is running on its behalf.
    Running,
    /// Its current task is busy with another run; waiting for the re-run.
    Waiting,
}

#[derive(Debug, Clone)]
pub(crate) struct Burst {
    pub(crate) id: BurstId,
    pub(crate) kind: BurstKind,
    pub(crate) policy: ChainPolicy,
    pub(crate) chain: Vec<TaskName>,
    /// Index of the task currently running or waited on.
    pub(crate) cursor: usize,
    pub(crate) state: BurstState,
    pub(crate) failures: Vec<TaskName>,
    pub(crate) aborted: bool,
    /// Paths that fed this burst.
    pub(crate) triggers: Vec<String>,
}

impl Burst {
    pub(crate) fn new(id: BurstId, kind: BurstKind, policy: ChainPolicy, chain: Vec<TaskName>) -> Self {
        Self {
            id,
            kind,
            policy,
            chain,
            cursor: 0,
            state: BurstState::Waiting,
            failures: Vec::new(),
            aborted: false,
            triggers: Vec::new(),
        }
    }

    pub(crate) fn current(&self) -> Option<&str> {
        self.chain.get(self.cursor).map(String::as_str)
    }

    /// Not started yet and queued behind a busy first task.
    pub(crate) fn is_queued(&self) -> bool {
        self.cursor == 0 && self.state == BurstState::Waiting
    }

    /// Fold another chain into this one.
    ///
    /// A superset replaces the chain outright; otherwise missing tasks are
    /// appended in their original order.
    pub(crate) fn absorb(&mut self, chain: &[TaskName], trigger: String) {
        if chain.len() > self.chain.len() && self.chain.iter().all(|t| chain.contains(t)) {
            self.chain = chain.to_vec();
        } else {
            for task in chain {
                if !self.chain.contains(task) {
                    self.chain.push(task.clone());
                }
            }
        }
        self.triggers.push(trigger);
    }

    pub(crate) fn finish(self) -> FinishedBurst {
        FinishedBurst {
            id: self.id,
            kind: self.kind,
            chain: self.chain,
            failures: self.failures,
            aborted: self.aborted,
            triggers: self.triggers,
        }
    }
}

/// A burst whose chain completed or aborted; owes exactly one reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedBurst {
    pub id: BurstId,
    pub kind: BurstKind,
    pub chain: Vec<TaskName>,
    pub failures: Vec<TaskName>,
    pub aborted: bool,
    pub triggers: Vec<String>,
}
