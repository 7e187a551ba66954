use crate::batch::SourceSelection;
use crate::config::Config;
use crate::run::{BatchReport, RunController, RunSettings};
use crate::session::SessionLauncher;
use crate::source::SourcePlan;
use crate::store::RecordStore;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Batch pacing plus the settings handed to every run
#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Pause between consecutive sources, not after the last one
    pub source_pause: Duration,
    pub run: RunSettings,
}

impl BatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_pause: config.run.source_pause(),
            run: RunSettings::from_config(config),
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Runs sources one after another and aggregates their reports
///
/// One source failing never affects the others: every run is converted into a
/// report by the [`RunController`], so the batch always completes.
pub struct Orchestrator {
    controller: RunController,
    source_pause: Duration,
}

impl Orchestrator {
    pub fn new(
        launcher: Arc<dyn SessionLauncher>,
        store: Arc<dyn RecordStore>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            controller: RunController::new(launcher, store, settings.run),
            source_pause: settings.source_pause,
        }
    }

    /// Runs every plan sequentially, in order
    pub async fn run_batch(&self, plans: &[SourcePlan]) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport::default();

        tracing::info!("Starting batch of {} sources", plans.len());

        for (i, plan) in plans.iter().enumerate() {
            if i > 0 && !self.source_pause.is_zero() {
                tracing::debug!(
                    "Pausing {}ms before {}",
                    self.source_pause.as_millis(),
                    plan.source_id()
                );
                tokio::time::sleep(self.source_pause).await;
            }

            report.runs.push(self.controller.run(plan).await);
        }

        report.elapsed = started.elapsed();
        tracing::info!(
            "Batch finished: {} succeeded, {} failed, {} new records",
            report.succeeded(),
            report.failed(),
            report.total_new()
        );
        report
    }

    /// Runs a resolved selection, carrying its unknown and skipped names into the report
    pub async fn run_selection(&self, selection: &SourceSelection) -> BatchReport {
        let mut report = self.run_batch(&selection.plans).await;
        report.unknown_sources = selection.unknown.clone();
        report.skipped_sources = selection.skipped.clone();
        report
    }

    /// Repeats the selection every `interval` until `cancel` fires
    ///
    /// The first batch starts immediately. Ticks missed while a batch overran the
    /// interval are dropped. Cancellation is observed between batches only, so a
    /// batch in progress always runs to completion. Returns the number of batches
    /// completed.
    pub async fn run_scheduled<F>(
        &self,
        selection: &SourceSelection,
        interval: Duration,
        cancel: CancellationToken,
        mut on_batch: F,
    ) -> usize
    where
        F: FnMut(&BatchReport),
    {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut completed = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Schedule cancelled after {} batches", completed);
                    break;
                }
                _ = ticker.tick() => {}
            }

            let report = self.run_selection(selection).await;
            completed += 1;
            on_batch(&report);

            tracing::info!(
                "Batch {} complete; next run in {}",
                completed,
                crate::run::format_duration(interval)
            );
        }

        completed
    }
}

/// Turns interrupt signals into a graceful stop, then a forced one
///
/// The first signal cancels `cancel` so the current batch can finish. Returns
/// `true` if a second signal arrives, `false` if `signals` ends first.
pub async fn watch_interrupts<S>(mut signals: S, cancel: CancellationToken) -> bool
where
    S: Stream<Item = ()> + Unpin,
{
    if signals.next().await.is_none() {
        return false;
    }
    tracing::info!(
        "Interrupt received, stopping after the current batch (interrupt again to exit now)"
    );
    cancel.cancel();

    if signals.next().await.is_none() {
        return false;
    }
    tracing::warn!("Second interrupt received, exiting without waiting");
    true
}
