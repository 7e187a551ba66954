//! Multi-source batches through the orchestrator

use crate::common::{
    fast_batch_settings, http_launcher, mount_deal, mount_index, mount_marketplace, mount_page,
    mount_status, CountingLauncher, FailingStore,
};
use async_trait::async_trait;
use rwa_watch::batch::{select_sources, Orchestrator, Selection};
use rwa_watch::config::{Config, SourceEntry};
use rwa_watch::record::{Record, RecordBuilder};
use rwa_watch::run::{RunState, RunStatus};
use rwa_watch::session::{Session, SessionOptions};
use rwa_watch::source::{build_extractor, ExtractContext, SourceExtractor, SourceKind, SourcePlan};
use rwa_watch::store::{FileStore, RecordStore};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::MockServer;

fn plan(kind: SourceKind, server: &MockServer) -> SourcePlan {
    let extractor = build_extractor(kind, Some(&server.uri())).expect("valid base url");
    SourcePlan::new(extractor, SessionOptions::default())
}

/// Extractor that panics while enumerating
struct ExplodingSource;

#[async_trait]
impl SourceExtractor for ExplodingSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Fraxtor
    }

    async fn enumerate(
        &self,
        _session: &mut dyn Session,
        _ctx: &ExtractContext,
    ) -> rwa_watch::Result<Vec<String>> {
        panic!("selector engine exploded");
    }

    async fn fetch_detail(
        &self,
        _session: &mut dyn Session,
        _endpoint: &str,
        _ctx: &ExtractContext,
    ) -> rwa_watch::Result<Record> {
        unreachable!("never enumerated")
    }
}

/// Extractor serving fixed endpoints that panics while fetching one of them
struct PanickyDetailSource {
    endpoints: Vec<String>,
    panics_on: String,
}

impl PanickyDetailSource {
    fn plan(slugs: &[&str], panics_on: &str) -> SourcePlan {
        let source = Self {
            endpoints: slugs
                .iter()
                .map(|slug| format!("https://deals.example.com/deal/{}", slug))
                .collect(),
            panics_on: format!("https://deals.example.com/deal/{}", panics_on),
        };
        SourcePlan::new(Arc::new(source), SessionOptions::default())
    }
}

#[async_trait]
impl SourceExtractor for PanickyDetailSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Reental
    }

    async fn enumerate(
        &self,
        _session: &mut dyn Session,
        _ctx: &ExtractContext,
    ) -> rwa_watch::Result<Vec<String>> {
        Ok(self.endpoints.clone())
    }

    async fn fetch_detail(
        &self,
        _session: &mut dyn Session,
        endpoint: &str,
        _ctx: &ExtractContext,
    ) -> rwa_watch::Result<Record> {
        if endpoint == self.panics_on {
            panic!("detail layout changed");
        }
        Ok(
            RecordBuilder::new(self.source_id(), self.source_name(), endpoint)
                .set("title", Some(format!("Deal {}", endpoint)))
                .build(),
        )
    }
}

/// Three sources on three servers: Lofty, Reental and Binaryx
async fn three_sources() -> (MockServer, MockServer, MockServer) {
    let lofty = MockServer::start().await;
    mount_marketplace(&lofty, &["a1"]).await;
    mount_deal(&lofty, "a1").await;

    let reental = MockServer::start().await;
    mount_index(&reental, "/", "/property/", &["b1"]).await;
    mount_page(
        &reental,
        "/property/b1",
        "<h1>Casa Sol</h1><p>Rentabilidad 8,5%</p>",
    )
    .await;

    let binaryx = MockServer::start().await;
    mount_index(&binaryx, "/", "/listing/", &["c1", "c2"]).await;
    mount_page(&binaryx, "/listing/c1", "<h1>Marina View</h1>").await;
    mount_page(&binaryx, "/listing/c2", "<h1>Palm Court</h1>").await;

    (lofty, reental, binaryx)
}

#[tokio::test]
async fn test_persist_failure_is_isolated_to_its_source() {
    let (lofty, reental, binaryx) = three_sources().await;
    let dir = TempDir::new().unwrap();
    let files = FileStore::new(dir.path());
    let store = Arc::new(FailingStore::new(files.clone(), "reental"));
    let orchestrator = Orchestrator::new(http_launcher(), store, fast_batch_settings());

    let plans = vec![
        plan(SourceKind::Lofty, &lofty),
        plan(SourceKind::Reental, &reental),
        plan(SourceKind::Binaryx, &binaryx),
    ];
    let report = orchestrator.run_batch(&plans).await;

    assert_eq!(report.runs.len(), 3);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);

    let failed = report.run("reental").unwrap();
    assert_eq!(failed.status, RunStatus::Failed);
    assert_eq!(failed.final_state, RunState::Persisting);
    assert!(failed.error.as_deref().unwrap().contains("disk full"));
    assert!(files.load_history("reental").unwrap().is_none());

    let last = report.run("binaryx").unwrap();
    assert!(last.is_success(), "{:?}", last.error);
    assert_eq!(last.record_count, 2);

    let records = FileStore::read_snapshot(last.snapshot_path.as_ref().unwrap()).unwrap();
    let titles: Vec<&str> = records.iter().map(|r| r.title()).collect();
    assert_eq!(titles, vec!["Marina View", "Palm Court"]);
    assert_eq!(files.load_history("binaryx").unwrap().unwrap().total_count, 2);
}

#[tokio::test]
async fn test_every_opened_session_is_closed() {
    let (lofty, _reental, binaryx) = three_sources().await;
    let down = MockServer::start().await;
    mount_status(&down, "/marketplace", 503).await;

    let dir = TempDir::new().unwrap();
    let launcher = Arc::new(CountingLauncher::new(http_launcher()));
    let orchestrator = Orchestrator::new(
        launcher.clone(),
        Arc::new(FileStore::new(dir.path())),
        fast_batch_settings(),
    );

    let plans = vec![
        plan(SourceKind::Lofty, &lofty),
        SourcePlan::new(Arc::new(ExplodingSource), SessionOptions::default()),
        plan(SourceKind::Binaryx, &binaryx),
    ];
    let report = orchestrator.run_batch(&plans).await;

    let exploded = report.run("fraxtor").unwrap();
    assert_eq!(exploded.status, RunStatus::Failed);
    assert_eq!(exploded.final_state, RunState::Enumerating);
    assert!(exploded
        .error
        .as_deref()
        .unwrap()
        .contains("selector engine exploded"));
    assert!(report.run("binaryx").unwrap().is_success());

    // A source whose index is down also releases its session
    let down_report = orchestrator
        .run_batch(&[SourcePlan::new(
            build_extractor(SourceKind::Lofty, Some(&down.uri())).unwrap(),
            SessionOptions::default(),
        )])
        .await;
    assert_eq!(down_report.failed(), 1);

    assert_eq!(launcher.opened(), 4);
    assert_eq!(launcher.closed(), 4);
}

#[tokio::test]
async fn test_session_open_failure_fails_run() {
    let (lofty, _reental, binaryx) = three_sources().await;
    let dir = TempDir::new().unwrap();
    let launcher = Arc::new(CountingLauncher::failing());
    let orchestrator = Orchestrator::new(
        launcher.clone(),
        Arc::new(FileStore::new(dir.path())),
        fast_batch_settings(),
    );

    let report = orchestrator
        .run_batch(&[
            plan(SourceKind::Lofty, &lofty),
            plan(SourceKind::Binaryx, &binaryx),
        ])
        .await;

    assert_eq!(report.failed(), 2);
    for run in &report.runs {
        assert_eq!(run.final_state, RunState::SessionOpen);
        assert!(run.error.as_deref().unwrap().contains("no browser available"));
    }
    assert_eq!(launcher.opened(), 0);
    assert_eq!(launcher.closed(), 0);
}

#[tokio::test]
async fn test_selection_from_config_runs_configured_sources() {
    let (lofty, _reental, binaryx) = three_sources().await;
    let dir = TempDir::new().unwrap();

    let mut config = Config::default();
    config.sources = vec![
        SourceEntry {
            base_url: Some(lofty.uri()),
            ..SourceEntry::new("lofty")
        },
        SourceEntry {
            base_url: Some(binaryx.uri()),
            ..SourceEntry::new("binaryx")
        },
        SourceEntry {
            opt_in: true,
            use_proxy: true,
            ..SourceEntry::new("realt")
        },
    ];

    let selection = select_sources(
        &config,
        &Selection::All {
            include: vec!["propbase".to_string()],
        },
    )
    .unwrap();

    let orchestrator = Orchestrator::new(
        http_launcher(),
        Arc::new(FileStore::new(dir.path())),
        fast_batch_settings(),
    );
    let report = orchestrator.run_selection(&selection).await;

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.total_records(), 3);
    assert_eq!(report.total_new(), 3);
    assert_eq!(report.skipped_sources, vec!["realt"]);
    assert_eq!(report.unknown_sources, vec!["propbase"]);
}

#[tokio::test]
async fn test_panicking_item_is_skipped_and_run_succeeds() {
    let dir = TempDir::new().unwrap();
    let files = FileStore::new(dir.path());
    let launcher = Arc::new(CountingLauncher::new(http_launcher()));
    let orchestrator = Orchestrator::new(
        launcher.clone(),
        Arc::new(files.clone()),
        fast_batch_settings(),
    );

    let report = orchestrator
        .run_batch(&[PanickyDetailSource::plan(&["a", "b", "c"], "b")])
        .await;

    let run = report.run("reental").unwrap();
    assert_eq!(run.status, RunStatus::Success, "{:?}", run.error);
    assert_eq!(run.final_state, RunState::Done);
    assert_eq!(run.record_count, 2);
    assert_eq!(run.skipped_items, 1);

    let records = FileStore::read_snapshot(run.snapshot_path.as_ref().unwrap()).unwrap();
    let written: Vec<&str> = records.iter().map(|r| r.record_id.as_str()).collect();
    assert_eq!(written, vec!["a", "c"]);

    let history = files.load_history("reental").unwrap().unwrap();
    assert!(history.contains("a"));
    assert!(!history.contains("b"));

    assert_eq!(launcher.opened(), 1);
    assert_eq!(launcher.closed(), 1);
}
