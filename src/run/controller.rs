use crate::config::Config;
use crate::detect::detect_new;
use crate::record::SnapshotBuilder;
use crate::run::{NewRecord, RunReport, RunState, RunStatus};
use crate::session::{Session, SessionLauncher};
use crate::source::{ExtractContext, SourcePlan};
use crate::store::{History, RecordStore, StoreError};
use crate::{Result, WatchError};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pacing and scrolling parameters for a run
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Pause before every detail fetch
    pub item_pause: Duration,
    pub max_scroll_rounds: u32,
    pub settle_delay: Duration,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            item_pause: config.run.item_pause(),
            max_scroll_rounds: config.session.max_scroll_rounds,
            settle_delay: config.session.settle_delay(),
        }
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Tracks the state of one run and rejects illegal transitions
#[derive(Debug)]
struct StateTracker {
    source_id: &'static str,
    state: RunState,
}

impl StateTracker {
    fn new(source_id: &'static str) -> Self {
        Self {
            source_id,
            state: RunState::Idle,
        }
    }

    fn advance(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(WatchError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("{}: {} -> {}", self.source_id, self.state, next);
        self.state = next;
        Ok(())
    }

    fn fail(&mut self) {
        if self.state.can_transition_to(RunState::Failed) {
            tracing::debug!("{}: {} -> failed", self.source_id, self.state);
            self.state = RunState::Failed;
        }
    }
}

/// What a completed run produced
struct RunOutcome {
    record_count: usize,
    skipped_items: usize,
    new_records: Vec<NewRecord>,
    snapshot_path: PathBuf,
}

/// Drives one source end to end
///
/// `run` never returns an error: every failure is converted into a failed
/// [`RunReport`]. The session opened for a run is closed exactly once, whether the
/// run succeeded, failed, or the extractor panicked.
pub struct RunController {
    launcher: Arc<dyn SessionLauncher>,
    store: Arc<dyn RecordStore>,
    settings: RunSettings,
}

impl RunController {
    pub fn new(
        launcher: Arc<dyn SessionLauncher>,
        store: Arc<dyn RecordStore>,
        settings: RunSettings,
    ) -> Self {
        Self {
            launcher,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Runs one source and reports the result
    pub async fn run(&self, plan: &SourcePlan) -> RunReport {
        let started = Instant::now();
        let fetched_at = Utc::now();
        let source_id = plan.source_id();
        let mut tracker = StateTracker::new(source_id);

        tracing::info!("Starting {} ({})", plan.source_name(), source_id);

        let opened = match tracker.advance(RunState::SessionOpen) {
            Ok(()) => self
                .launcher
                .open(&plan.options)
                .await
                .map_err(WatchError::from),
            Err(e) => Err(e),
        };

        let result = match opened {
            Ok(mut session) => {
                let driven =
                    AssertUnwindSafe(self.drive(plan, session.as_mut(), &mut tracker, fetched_at))
                        .catch_unwind()
                        .await;

                if let Err(e) = session.close().await {
                    tracing::warn!("{}: failed to release session: {}", source_id, e);
                }

                match driven {
                    Ok(result) => result,
                    Err(panic) => Err(WatchError::Panicked(panic_message(panic.as_ref()))),
                }
            }
            Err(e) => Err(e),
        };

        let elapsed = started.elapsed();
        match result {
            Ok(outcome) => {
                tracing::info!(
                    "Finished {}: {} records ({} new) in {:.1}s",
                    source_id,
                    outcome.record_count,
                    outcome.new_records.len(),
                    elapsed.as_secs_f64()
                );
                RunReport {
                    source_id: source_id.to_string(),
                    source_name: plan.source_name().to_string(),
                    status: RunStatus::Success,
                    final_state: tracker.state,
                    record_count: outcome.record_count,
                    skipped_items: outcome.skipped_items,
                    new_records: outcome.new_records,
                    snapshot_path: Some(outcome.snapshot_path),
                    elapsed,
                    error: None,
                }
            }
            Err(e) => {
                let failed_in = tracker.state;
                tracker.fail();
                tracing::error!("{} failed during {}: {}", source_id, failed_in, e);
                RunReport {
                    source_id: source_id.to_string(),
                    source_name: plan.source_name().to_string(),
                    status: RunStatus::Failed,
                    final_state: failed_in,
                    record_count: 0,
                    skipped_items: 0,
                    new_records: Vec::new(),
                    snapshot_path: None,
                    elapsed,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn drive(
        &self,
        plan: &SourcePlan,
        session: &mut dyn Session,
        tracker: &mut StateTracker,
        fetched_at: DateTime<Utc>,
    ) -> Result<RunOutcome> {
        let extractor = plan.extractor.as_ref();
        let source_id = plan.source_id();
        let ctx = ExtractContext {
            max_scroll_rounds: self.settings.max_scroll_rounds,
            settle_delay: self.settings.settle_delay,
            documents: self.store.documents(source_id),
        };

        tracker.advance(RunState::Enumerating)?;
        let endpoints = extractor.enumerate(session, &ctx).await?;
        tracing::info!("{}: found {} items", source_id, endpoints.len());

        tracker.advance(RunState::FetchingDetails)?;
        let mut snapshot = SnapshotBuilder::new(source_id, fetched_at);
        let mut skipped = 0;
        let total = endpoints.len();

        for (i, endpoint) in endpoints.iter().enumerate() {
            tokio::time::sleep(self.settings.item_pause).await;
            tracing::info!("[{}/{}] {}", i + 1, total, endpoint);

            let fetched = AssertUnwindSafe(extractor.fetch_detail(session, endpoint, &ctx))
                .catch_unwind()
                .await;

            match fetched {
                Ok(Ok(record)) => snapshot.push(record),
                Ok(Err(e)) => {
                    tracing::warn!("Skipping {}: {}", endpoint, e);
                    skipped += 1;
                }
                Err(panic) => {
                    tracing::warn!(
                        "Skipping {}: extractor panicked: {}",
                        endpoint,
                        panic_message(panic.as_ref())
                    );
                    skipped += 1;
                }
            }
        }
        let snapshot = snapshot.finish();

        tracker.advance(RunState::Persisting)?;
        let snapshot_path = self.store.write_snapshot(&snapshot)?;
        tracing::info!(
            "{}: saved {} records to {}",
            source_id,
            snapshot.len(),
            snapshot_path.display()
        );

        tracker.advance(RunState::DiffingHistory)?;
        let previous = match self.store.load_history(source_id) {
            Ok(previous) => previous,
            Err(StoreError::CorruptHistory { path, message }) => {
                tracing::warn!(
                    "Ignoring unreadable history {} ({}); treating every record as new",
                    path,
                    message
                );
                None
            }
            Err(e) => return Err(e.into()),
        };

        let new_records: Vec<NewRecord> = detect_new(previous.as_ref(), &snapshot)
            .into_iter()
            .map(|record| NewRecord {
                record_id: record.record_id.clone(),
                title: record.title().to_string(),
            })
            .collect();

        if new_records.is_empty() {
            tracing::info!("{}: no new records", source_id);
        } else {
            tracing::info!("{}: {} new records", source_id, new_records.len());
            for record in &new_records {
                tracing::info!("  + {}", record.title);
            }
        }

        self.store
            .replace_history(source_id, &History::from_snapshot(&snapshot, Utc::now()))?;
        tracker.advance(RunState::Done)?;

        Ok(RunOutcome {
            record_count: snapshot.len(),
            skipped_items: skipped,
            new_records,
            snapshot_path,
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
