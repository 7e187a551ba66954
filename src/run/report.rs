//! Run and batch reports
//!
//! Reports are plain values: a failed run is described here, never raised to the
//! caller.

use crate::run::RunState;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of one source run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A record first seen in this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub record_id: String,
    pub title: String,
}

/// Per-source result of one batch
#[derive(Debug, Clone)]
pub struct RunReport {
    pub source_id: String,
    pub source_name: String,
    pub status: RunStatus,

    /// State the run ended in (`Done` on success)
    pub final_state: RunState,

    /// Records in the persisted snapshot
    pub record_count: usize,

    /// Endpoints whose detail fetch failed and was skipped
    pub skipped_items: usize,

    /// Records absent from the previous history, in snapshot order
    pub new_records: Vec<NewRecord>,

    pub snapshot_path: Option<PathBuf>,
    pub elapsed: Duration,

    /// Error description when the run failed
    pub error: Option<String>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Aggregate of every run in one batch
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub runs: Vec<RunReport>,

    /// Names requested but not matching any configured source
    pub unknown_sources: Vec<String>,

    /// Opt-in sources left out of a "run everything" batch
    pub skipped_sources: Vec<String>,

    pub elapsed: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.runs.iter().filter(|r| !r.is_success()).count()
    }

    pub fn total_records(&self) -> usize {
        self.runs.iter().map(|r| r.record_count).sum()
    }

    pub fn total_new(&self) -> usize {
        self.runs.iter().map(|r| r.new_records.len()).sum()
    }

    pub fn run(&self, source_id: &str) -> Option<&RunReport> {
        self.runs.iter().find(|r| r.source_id == source_id)
    }
}

/// Formats a duration as `1h 02m 03s`, `2m 03s` or `4.2s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

/// Prints a batch summary to stdout in a formatted manner
pub fn print_batch_summary(report: &BatchReport) {
    println!("=== Batch Summary ===\n");

    println!("Sources:");
    for run in &report.runs {
        match run.status {
            RunStatus::Success => println!(
                "  {:<12} {:<8} {:>5} records ({} new, {} skipped) in {}",
                run.source_id,
                run.status,
                run.record_count,
                run.new_records.len(),
                run.skipped_items,
                format_duration(run.elapsed)
            ),
            RunStatus::Failed => println!(
                "  {:<12} {:<8} at {} after {}: {}",
                run.source_id,
                run.status,
                run.final_state,
                format_duration(run.elapsed),
                run.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    println!();

    let with_new: Vec<_> = report
        .runs
        .iter()
        .filter(|r| !r.new_records.is_empty())
        .collect();
    if !with_new.is_empty() {
        println!("New Listings ({}):", report.total_new());
        for run in with_new {
            for record in &run.new_records {
                println!("  - [{}] {}", run.source_name, record.title);
            }
        }
        println!();
    }

    if !report.unknown_sources.is_empty() {
        println!("Unknown Sources ({}):", report.unknown_sources.len());
        for name in &report.unknown_sources {
            println!("  - {}", name);
        }
        println!();
    }

    if !report.skipped_sources.is_empty() {
        println!(
            "Opt-in Sources Not Run ({}): {}",
            report.skipped_sources.len(),
            report.skipped_sources.join(", ")
        );
        println!();
    }

    println!(
        "Totals: {} succeeded, {} failed, {} records in {}",
        report.succeeded(),
        report.failed(),
        report.total_records(),
        format_duration(report.elapsed)
    );
}
