//! Acquisition session module
//!
//! A session owns one rendering context for the duration of a source run and
//! exposes the primitives extractors build on:
//! - Navigation with a bounded timeout
//! - Scroll-to-exhaustion for lazy-loading index pages
//! - Best-effort element and text extraction (absence is a value, not an error)
//! - Binary fetches for ancillary documents
//!
//! Two renderers back a session: headless Chromium ([`ChromiumSession`]) and a
//! static HTTP fetch ([`HttpSession`]). Every `open` must be paired with exactly one
//! `close`, which consumes the session.

mod chromium;
mod dom;
mod http;

pub use chromium::ChromiumSession;
pub use dom::{
    body_text, labeled_text, labeled_texts, resolve_link, select_all, select_text, LabelScope,
};
pub use http::{build_http_client, HttpSession};

use crate::config::{Renderer, SessionConfig};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by an acquisition session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to start renderer: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("No page has been loaded")]
    NoPage,

    #[error("Failed to close session: {0}")]
    Close(String),
}

/// One element matched by a selector
///
/// `href` and `src` attributes are resolved to absolute URLs against the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub text: String,
    pub attrs: BTreeMap<String, String>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn href(&self) -> Option<&str> {
        self.attr("href")
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }
}

/// A label search over the current page
///
/// Matches elements whose own text contains one of `needles` and yields either
/// that element's text or its parent's, optionally requiring one of the `require`
/// markers (such as `%` or `$`) to be present in the result.
#[derive(Debug, Clone, Copy)]
pub struct LabelQuery<'a> {
    pub needles: &'a [&'a str],
    pub scope: LabelScope,
    pub require: &'a [&'a str],
}

impl<'a> LabelQuery<'a> {
    /// Text of the parent of a labelled element (label plus value)
    pub fn parent(needles: &'a [&'a str]) -> Self {
        Self {
            needles,
            scope: LabelScope::Parent,
            require: &[],
        }
    }

    /// Text of a labelled element itself
    pub fn own(needles: &'a [&'a str]) -> Self {
        Self {
            needles,
            scope: LabelScope::Own,
            require: &[],
        }
    }

    /// Text of a labelled element that also contains one of `markers`
    pub fn own_with(needles: &'a [&'a str], markers: &'a [&'a str]) -> Self {
        Self {
            needles,
            scope: LabelScope::Own,
            require: markers,
        }
    }
}

/// A live acquisition session
///
/// Only `navigate`, `scroll_to_exhaustion`, `html`, `current_url`, `fetch_binary`
/// and `close` are renderer-specific; the extraction primitives work on the
/// rendered document.
#[async_trait]
pub trait Session: Send {
    /// Loads `url` as the current page
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Scrolls to the bottom until the page stops growing or `max_rounds` is hit
    ///
    /// Returns the number of scroll rounds performed.
    async fn scroll_to_exhaustion(&mut self, max_rounds: u32, settle: Duration) -> u32;

    /// Serialized DOM of the current page
    async fn html(&mut self) -> Result<String, SessionError>;

    /// URL of the current page after redirects
    fn current_url(&self) -> Option<&str>;

    /// Fetches a binary resource through the session's network identity
    async fn fetch_binary(&mut self, url: &str) -> Result<Vec<u8>, SessionError>;

    /// Releases the rendering context
    async fn close(self: Box<Self>) -> Result<(), SessionError>;

    /// Text of the first element matching `selector`
    async fn extract_text(&mut self, selector: &str) -> Option<String> {
        let html = self.html().await.ok()?;
        select_text(&html, selector)
    }

    /// Every element matching `selector`, in document order
    async fn extract_all(&mut self, selector: &str) -> Vec<Element> {
        let base = self.current_url().map(str::to_string);
        match self.html().await {
            Ok(html) => select_all(&html, selector, base.as_deref()),
            Err(e) => {
                tracing::debug!("extract_all({}) skipped: {}", selector, e);
                Vec::new()
            }
        }
    }

    /// Visible text of the page body, one text run per line
    async fn page_text(&mut self) -> Option<String> {
        let html = self.html().await.ok()?;
        body_text(&html)
    }

    /// First text located through a label search
    async fn extract_labeled(&mut self, query: LabelQuery<'_>) -> Option<String> {
        let html = self.html().await.ok()?;
        labeled_text(&html, query.needles, query.scope, query.require)
    }

    /// Every text located through a label search, in document order
    async fn extract_labeled_all(&mut self, query: LabelQuery<'_>) -> Vec<String> {
        match self.html().await {
            Ok(html) => labeled_texts(&html, query.needles, query.scope, query.require),
            Err(_) => Vec::new(),
        }
    }
}

/// Per-open options chosen by the source being run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Route traffic through the configured upstream proxy
    pub use_proxy: bool,
}

/// Opens sessions; one call per source run
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn open(&self, options: &SessionOptions) -> Result<Box<dyn Session>, SessionError>;
}

/// Launcher backed by the configured renderer
#[derive(Debug, Clone)]
pub struct BrowserLauncher {
    config: SessionConfig,
}

impl BrowserLauncher {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Proxy to use for a session, if the source asked for one and it is configured
    pub fn proxy_for(&self, options: &SessionOptions) -> Option<&str> {
        if !options.use_proxy {
            return None;
        }
        let proxy = self.config.proxy.as_deref();
        if proxy.is_none() {
            tracing::warn!("Source requested a proxy but none is configured (set PROXY_URL)");
        }
        proxy
    }
}

#[async_trait]
impl SessionLauncher for BrowserLauncher {
    async fn open(&self, options: &SessionOptions) -> Result<Box<dyn Session>, SessionError> {
        let proxy = self.proxy_for(options);

        match self.config.renderer {
            Renderer::Chromium => {
                let session = ChromiumSession::launch(&self.config, proxy).await?;
                Ok(Box::new(session))
            }
            Renderer::Http => {
                let session = HttpSession::new(&self.config, proxy)?;
                Ok(Box::new(session))
            }
        }
    }
}
