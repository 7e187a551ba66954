//! Run controller module
//!
//! This module drives a single source through its run:
//! - Opening and always releasing the acquisition session
//! - Enumerating items and fetching each one with per-item isolation
//! - Persisting the snapshot, diffing against history and replacing it
//! - Reporting the outcome as a value

mod controller;
mod report;
mod state;

pub use controller::{RunController, RunSettings};
pub use report::{format_duration, print_batch_summary, BatchReport, NewRecord, RunReport, RunStatus};
pub use state::RunState;
