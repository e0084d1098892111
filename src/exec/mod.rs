// src/exec/mod.rs

//! Task execution layer.
//!
//! Runs the transforms of scheduled tasks and reports back to the
//! orchestration runtime via `RuntimeEvent`s.
//!
//! - [`task_runner`] runs a single task and reports its outcome.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
