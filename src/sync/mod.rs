//! The synchronization pipeline.
//!
//! Plugins are processed one at a time; a failing plugin is recorded in the
//! [`SyncReport`] and the batch moves on. The init file is merged exactly once
//! at the end, and a failure there is the only thing that fails the run.

mod orchestrator;
mod report;

pub use orchestrator::SyncOrchestrator;
pub use report::{PluginOutcome, PluginReport, SyncError, SyncReport};
