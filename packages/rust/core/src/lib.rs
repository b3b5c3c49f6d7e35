//! Orchestration for WikiForge runs.
//!
//! Ties the outline parser, generation client and document store together:
//! the [`pipeline`] drives a run, the [`scheduler`] fans out section writing,
//! the [`materializer`] publishes the finished trees, and progress flows over
//! the [`events`] bus to subscribers such as the [`status`] recorder.

pub mod events;
pub mod materializer;
pub mod pipeline;
pub mod scheduler;
pub mod status;

#[cfg(test)]
mod testing;

pub use events::{Event, EventBus, EventKind};
pub use materializer::{MaterializeReport, Materializer};
pub use pipeline::{Pipeline, PipelineRun, PipelineSettings, RunReport, Stage};
pub use scheduler::{DEFAULT_CONCURRENCY, Scheduler};
pub use status::{DEFAULT_STATUS_TTL, StatusRecorder};
