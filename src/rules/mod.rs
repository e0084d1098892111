// src/rules/mod.rs

//! Path rules and the task registry.
//!
//! - [`glob`] compiles a rule's source/watch/exclude globs into a
//!   [`PathRule`].
//! - [`registry`] binds each rule to a transform as a [`Task`] and validates
//!   that ownership of files is unambiguous.
//! - [`chain`] holds the declarative chain of tasks each category triggers.

pub mod chain;
pub mod glob;
pub mod registry;

pub use chain::ChainTable;
pub use glob::{glob_base, PathRule, SourceGlob};
pub use registry::{Task, TaskRegistry};
