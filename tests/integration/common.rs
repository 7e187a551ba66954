//! Shared fixtures: mock marketplaces, fast settings and instrumented stores/launchers

use async_trait::async_trait;
use rwa_watch::batch::BatchSettings;
use rwa_watch::config::{Renderer, SessionConfig};
use rwa_watch::record::Snapshot;
use rwa_watch::run::RunSettings;
use rwa_watch::session::{BrowserLauncher, Session, SessionError, SessionLauncher, SessionOptions};
use rwa_watch::store::{DocumentStore, FileStore, History, RecordStore, StoreError, StoreResult};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Session config for the static renderer with short timeouts
pub fn http_session_config() -> SessionConfig {
    SessionConfig {
        renderer: Renderer::Http,
        navigation_timeout_ms: 5000,
        settle_delay_ms: 0,
        max_scroll_rounds: 1,
        download_timeout_secs: 5,
        ..SessionConfig::default()
    }
}

pub fn http_launcher() -> Arc<BrowserLauncher> {
    Arc::new(BrowserLauncher::new(http_session_config()))
}

pub fn fast_run_settings() -> RunSettings {
    RunSettings {
        item_pause: Duration::from_millis(1),
        max_scroll_rounds: 1,
        settle_delay: Duration::ZERO,
    }
}

pub fn fast_batch_settings() -> BatchSettings {
    BatchSettings {
        source_pause: Duration::from_millis(1),
        run: fast_run_settings(),
    }
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

/// Mounts an index page at `index_path` linking to `<prefix><slug>` for every slug
pub async fn mount_index(server: &MockServer, index_path: &str, prefix: &str, slugs: &[&str]) {
    let links: String = slugs
        .iter()
        .map(|slug| format!(r#"<a href="{}{}">{}</a>"#, prefix, slug, slug))
        .collect();

    Mock::given(method("GET"))
        .and(path(index_path))
        .respond_with(html_page(&format!("<h2>Listings</h2>{}", links)))
        .mount(server)
        .await;
}

/// Mounts the Lofty marketplace page listing `/property_deal/<slug>` items
pub async fn mount_marketplace(server: &MockServer, slugs: &[&str]) {
    mount_index(server, "/marketplace", "/property_deal/", slugs).await;
}

/// Mounts one Lofty-style detail page
pub async fn mount_deal(server: &MockServer, slug: &str) {
    let body = format!(
        r#"<h1>{slug} Main St</h1>
        <h4>Austin, TX</h4>
        <p>Projected Annual Return 11.2%</p>
        <p>Rental Yield: 7.5%</p>
        <p>3 Beds</p>
        <img src="https://images.lofty.ai/{slug}.jpg">
        <img src="/static/logo.png">"#,
        slug = slug
    );

    Mock::given(method("GET"))
        .and(path(format!("/property_deal/{}", slug)))
        .respond_with(html_page(&body))
        .mount(server)
        .await;
}

/// Mounts an arbitrary page
pub async fn mount_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

/// Mounts a failing response for one path
pub async fn mount_status(server: &MockServer, page_path: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// File store that refuses snapshot writes for one source
pub struct FailingStore {
    inner: FileStore,
    fail_source: String,
}

impl FailingStore {
    pub fn new(inner: FileStore, fail_source: &str) -> Self {
        Self {
            inner,
            fail_source: fail_source.to_string(),
        }
    }
}

impl RecordStore for FailingStore {
    fn write_snapshot(&self, snapshot: &Snapshot) -> StoreResult<PathBuf> {
        if snapshot.source_id() == self.fail_source {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.write_snapshot(snapshot)
    }

    fn load_history(&self, source_id: &str) -> StoreResult<Option<History>> {
        self.inner.load_history(source_id)
    }

    fn replace_history(&self, source_id: &str, history: &History) -> StoreResult<()> {
        self.inner.replace_history(source_id, history)
    }

    fn latest_snapshot(&self, source_id: &str) -> StoreResult<Option<PathBuf>> {
        self.inner.latest_snapshot(source_id)
    }

    fn documents(&self, source_id: &str) -> DocumentStore {
        self.inner.documents(source_id)
    }
}

/// Launcher wrapper counting opened and closed sessions
pub struct CountingLauncher {
    inner: Arc<dyn SessionLauncher>,
    fail_open: bool,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl CountingLauncher {
    pub fn new(inner: Arc<dyn SessionLauncher>) -> Self {
        Self {
            inner,
            fail_open: false,
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A launcher whose every open fails
    pub fn failing() -> Self {
        let mut launcher = Self::new(http_launcher());
        launcher.fail_open = true;
        launcher
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for CountingLauncher {
    async fn open(&self, options: &SessionOptions) -> Result<Box<dyn Session>, SessionError> {
        if self.fail_open {
            return Err(SessionError::Launch("no browser available".to_string()));
        }
        let inner = self.inner.open(options).await?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountedSession {
            inner,
            closed: self.closed.clone(),
        }))
    }
}

struct CountedSession {
    inner: Box<dyn Session>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl Session for CountedSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.inner.navigate(url).await
    }

    async fn scroll_to_exhaustion(&mut self, max_rounds: u32, settle: Duration) -> u32 {
        self.inner.scroll_to_exhaustion(max_rounds, settle).await
    }

    async fn html(&mut self) -> Result<String, SessionError> {
        self.inner.html().await
    }

    fn current_url(&self) -> Option<&str> {
        self.inner.current_url()
    }

    async fn fetch_binary(&mut self, url: &str) -> Result<Vec<u8>, SessionError> {
        self.inner.fetch_binary(url).await
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}
