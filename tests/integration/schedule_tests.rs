//! Scheduled batches and cancellation

use crate::common::{fast_batch_settings, http_launcher, mount_deal, mount_marketplace};
use rwa_watch::batch::{Orchestrator, SourceSelection};
use rwa_watch::session::SessionOptions;
use rwa_watch::source::{build_extractor, SourceKind, SourcePlan};
use rwa_watch::store::FileStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

async fn lofty_selection(server: &MockServer) -> SourceSelection {
    mount_marketplace(server, &["a", "b"]).await;
    mount_deal(server, "a").await;
    mount_deal(server, "b").await;

    SourceSelection {
        plans: vec![SourcePlan::new(
            build_extractor(SourceKind::Lofty, Some(&server.uri())).unwrap(),
            SessionOptions::default(),
        )],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_scheduled_batches_until_cancelled() {
    let server = MockServer::start().await;
    let selection = lofty_selection(&server).await;
    let dir = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(
        http_launcher(),
        Arc::new(FileStore::new(dir.path())),
        fast_batch_settings(),
    );

    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    let mut new_per_batch = Vec::new();

    let completed = orchestrator
        .run_scheduled(&selection, Duration::from_millis(20), cancel, |report| {
            new_per_batch.push(report.total_new());
            if new_per_batch.len() == 3 {
                stopper.cancel();
            }
        })
        .await;

    assert_eq!(completed, 3);
    // Only the first batch sees anything new
    assert_eq!(new_per_batch, vec![2, 0, 0]);
}

#[tokio::test]
async fn test_cancel_while_waiting_for_next_tick() {
    let server = MockServer::start().await;
    let selection = lofty_selection(&server).await;
    let dir = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(
        http_launcher(),
        Arc::new(FileStore::new(dir.path())),
        fast_batch_settings(),
    );

    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        stopper.cancel();
    });

    // An hour-long interval: only the immediate first batch runs
    let completed = tokio::time::timeout(
        Duration::from_secs(30),
        orchestrator.run_scheduled(&selection, Duration::from_secs(3600), cancel, |_| {}),
    )
    .await
    .expect("schedule stops promptly once cancelled");

    assert_eq!(completed, 1);
}
