//! Canonical ordered collections for jobs and auto-scheduler rules.
//!
//! Both registries follow a single-writer discipline: the owning store is
//! the only mutator, and every operation is total and idempotent so that
//! replayed stream events cannot corrupt the collection.

pub mod jobs;
pub mod scheduler;

pub use jobs::JobRegistry;
pub use scheduler::SchedulerRegistry;
