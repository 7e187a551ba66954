//! Single-source runs through the run controller

use crate::common::{
    fast_run_settings, http_launcher, mount_deal, mount_index, mount_marketplace, mount_page,
    mount_status,
};
use rwa_watch::run::{RunController, RunState, RunStatus};
use rwa_watch::session::SessionOptions;
use rwa_watch::source::{build_extractor, SourceKind, SourcePlan};
use rwa_watch::store::{FileStore, RecordStore, HISTORY_FILE};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn plan(kind: SourceKind, server: &MockServer) -> SourcePlan {
    let extractor = build_extractor(kind, Some(&server.uri())).expect("valid base url");
    SourcePlan::new(extractor, SessionOptions::default())
}

fn controller(store: &FileStore) -> RunController {
    RunController::new(
        http_launcher(),
        Arc::new(store.clone()),
        fast_run_settings(),
    )
}

fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_first_run_all_new_then_only_additions() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    let controller = controller(&store);

    mount_marketplace(&server, &["a", "b"]).await;
    mount_deal(&server, "a").await;
    mount_deal(&server, "b").await;

    let first = controller.run(&plan(SourceKind::Lofty, &server)).await;
    assert_eq!(first.status, RunStatus::Success, "{:?}", first.error);
    assert_eq!(first.final_state, RunState::Done);
    assert_eq!(first.record_count, 2);
    assert_eq!(first.new_records.len(), 2);

    let history = store.load_history("lofty").unwrap().unwrap();
    assert_eq!(history.record_ids, ids(&["a", "b"]));
    assert_eq!(history.total_count, 2);

    // The marketplace grows by one listing
    server.reset().await;
    mount_marketplace(&server, &["a", "b", "c"]).await;
    for slug in ["a", "b", "c"] {
        mount_deal(&server, slug).await;
    }

    let second = controller.run(&plan(SourceKind::Lofty, &server)).await;
    assert!(second.is_success(), "{:?}", second.error);
    assert_eq!(second.record_count, 3);
    assert_eq!(second.new_records.len(), 1);
    assert_eq!(second.new_records[0].record_id, "c");
    assert_eq!(second.new_records[0].title, "c Main St");

    let history = store.load_history("lofty").unwrap().unwrap();
    assert_eq!(history.record_ids, ids(&["a", "b", "c"]));

    // Snapshots are append-only: one per run
    assert_eq!(store.list_snapshots("lofty").unwrap().len(), 2);
}

#[tokio::test]
async fn test_unchanged_marketplace_reports_nothing_new() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    let controller = controller(&store);

    mount_marketplace(&server, &["a"]).await;
    mount_deal(&server, "a").await;

    controller.run(&plan(SourceKind::Lofty, &server)).await;
    let again = controller.run(&plan(SourceKind::Lofty, &server)).await;

    assert!(again.is_success());
    assert_eq!(again.record_count, 1);
    assert!(again.new_records.is_empty());
}

#[tokio::test]
async fn test_history_tracks_only_the_latest_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    let controller = controller(&store);

    mount_marketplace(&server, &["a", "b"]).await;
    mount_deal(&server, "a").await;
    mount_deal(&server, "b").await;
    controller.run(&plan(SourceKind::Lofty, &server)).await;

    // b is delisted
    server.reset().await;
    mount_marketplace(&server, &["a"]).await;
    mount_deal(&server, "a").await;
    let shrunk = controller.run(&plan(SourceKind::Lofty, &server)).await;
    assert!(shrunk.is_success(), "{:?}", shrunk.error);
    assert!(shrunk.new_records.is_empty());

    let history = store.load_history("lofty").unwrap().unwrap();
    assert_eq!(history.record_ids, ids(&["a"]));
    assert_eq!(history.total_count, 1);

    // b is relisted and counts as new again
    server.reset().await;
    mount_marketplace(&server, &["a", "b"]).await;
    mount_deal(&server, "a").await;
    mount_deal(&server, "b").await;
    let relisted = controller.run(&plan(SourceKind::Lofty, &server)).await;
    assert!(relisted.is_success(), "{:?}", relisted.error);
    assert_eq!(relisted.new_records.len(), 1);
    assert_eq!(relisted.new_records[0].record_id, "b");
}

#[tokio::test]
async fn test_failed_item_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());

    mount_marketplace(&server, &["a", "b", "c", "d", "e"]).await;
    for slug in ["a", "b", "d", "e"] {
        mount_deal(&server, slug).await;
    }
    mount_status(&server, "/property_deal/c", 500).await;

    let report = controller(&store).run(&plan(SourceKind::Lofty, &server)).await;

    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.record_count, 4);
    assert_eq!(report.skipped_items, 1);

    let snapshot = report.snapshot_path.expect("snapshot written");
    let records = FileStore::read_snapshot(&snapshot).unwrap();
    let written: Vec<&str> = records.iter().map(|r| r.record_id.as_str()).collect();
    assert_eq!(written, vec!["a", "b", "d", "e"]);

    let history = store.load_history("lofty").unwrap().unwrap();
    assert!(!history.contains("c"));
}

#[tokio::test]
async fn test_record_fields_from_detail_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());

    mount_marketplace(&server, &["oak"]).await;
    mount_deal(&server, "oak").await;

    let report = controller(&store).run(&plan(SourceKind::Lofty, &server)).await;
    let records = FileStore::read_snapshot(&report.snapshot_path.unwrap()).unwrap();
    let record = &records[0];

    assert_eq!(record.source_id, "lofty");
    assert_eq!(record.source_name, "Lofty.ai");
    assert_eq!(record.endpoint, format!("{}/property_deal/oak", server.uri()));
    assert_eq!(record.title(), "oak Main St");
    assert_eq!(record.field_str("city_state"), Some("Austin, TX"));
    assert_eq!(
        record.field("images").and_then(|v| v.as_array()).map(Vec::len),
        Some(1)
    );
    assert!(record.field("document_count").is_some());
}

#[tokio::test]
async fn test_index_failure_fails_run_without_touching_history() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());

    mount_status(&server, "/marketplace", 503).await;

    let report = controller(&store).run(&plan(SourceKind::Lofty, &server)).await;

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.final_state, RunState::Enumerating);
    assert!(report.error.as_deref().unwrap().contains("503"));
    assert!(report.snapshot_path.is_none());
    assert!(store.load_history("lofty").unwrap().is_none());
    assert!(store.list_snapshots("lofty").unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_index_is_a_successful_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());

    mount_marketplace(&server, &[]).await;

    let report = controller(&store).run(&plan(SourceKind::Lofty, &server)).await;

    assert!(report.is_success());
    assert_eq!(report.record_count, 0);
    assert!(report.new_records.is_empty());

    let history = store.load_history("lofty").unwrap().unwrap();
    assert_eq!(history.total_count, 0);
}

#[tokio::test]
async fn test_corrupt_history_treats_everything_as_new() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());

    std::fs::create_dir_all(store.source_dir("lofty")).unwrap();
    std::fs::write(store.source_dir("lofty").join(HISTORY_FILE), "{ not json").unwrap();

    mount_marketplace(&server, &["a", "b"]).await;
    mount_deal(&server, "a").await;
    mount_deal(&server, "b").await;

    let report = controller(&store).run(&plan(SourceKind::Lofty, &server)).await;

    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.new_records.len(), 2);

    let history = store.load_history("lofty").unwrap().unwrap();
    assert_eq!(history.record_ids, ids(&["a", "b"]));
}

#[tokio::test]
async fn test_site_profile_extraction_and_documents() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());

    mount_index(&server, "/", "/property/", &["lisbon-loft"]).await;
    mount_page(
        &server,
        "/property/lisbon-loft",
        r#"<h1>Lisbon Loft</h1>
        <div><span>Location</span> Lisbon, PT</div>
        <p>Price $120,000</p>
        <p>Yield 6.1%</p>
        <a href="/docs/prospectus.pdf">Prospectus</a>
        <a href="/docs/prospectus.pdf">Download the prospectus</a>
        <a href="/docs/missing.pdf?v=2">Appraisal</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/docs/prospectus.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 test".to_vec()))
        .mount(&server)
        .await;
    mount_status(&server, "/docs/missing.pdf", 404).await;

    let report = controller(&store).run(&plan(SourceKind::Binaryx, &server)).await;
    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.record_count, 1);

    let records = FileStore::read_snapshot(&report.snapshot_path.unwrap()).unwrap();
    let record = &records[0];
    assert_eq!(record.record_id, "lisbon-loft");
    assert_eq!(record.title(), "Lisbon Loft");
    assert!(record.field_str("location").unwrap().contains("Lisbon, PT"));
    assert_eq!(record.field_str("price"), Some("Price $120,000"));
    assert_eq!(record.field_str("return"), Some("Yield 6.1%"));
    assert_eq!(
        record.field("documents").and_then(|v| v.as_array()).map(Vec::len),
        Some(2)
    );

    // A failed download does not fail the record
    let documents = store.documents("binaryx");
    let saved = documents.dir().join("lisbon-loft_1.pdf");
    assert_eq!(std::fs::read(saved).unwrap(), b"%PDF-1.4 test");
    assert!(!documents.dir().join("lisbon-loft_2.pdf").exists());
}

#[tokio::test]
async fn test_csv_companion_written_when_enabled() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path()).with_csv(true);

    mount_marketplace(&server, &["a"]).await;
    mount_deal(&server, "a").await;

    let report = controller(&store).run(&plan(SourceKind::Lofty, &server)).await;
    let csv_path = report.snapshot_path.unwrap().with_extension("csv");

    let mut reader = csv::Reader::from_path(csv_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[3], "record_id");
    assert!(headers.iter().any(|h| h == "title"));

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][3], "a");
}
