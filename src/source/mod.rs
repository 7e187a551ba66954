//! Source extractors
//!
//! One extractor per listing site, all behind the [`SourceExtractor`] contract:
//! enumerate the item endpoints on the index page, then turn one endpoint into a
//! [`Record`]. The engine selects the variant from configuration and never branches
//! on source identity otherwise.

mod common;
mod generic;
mod lofty;
mod sites;

pub use common::{
    capture, classify_document, collect_endpoints, download_documents, document_extension,
    same_site, truncate_chars, DocumentLink,
};
pub use generic::{LabelRule, SiteExtractor, SiteProfile};
pub use lofty::LoftyExtractor;

use crate::config::SourceEntry;
use crate::record::Record;
use crate::session::{Session, SessionOptions};
use crate::store::DocumentStore;
use crate::{ConfigError, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Built-in listing sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    Lofty,
    RealT,
    Reental,
    Fraxtor,
    Binaryx,
}

impl SourceKind {
    /// Returns all built-in sources in roster order
    pub fn all() -> [Self; 5] {
        [
            Self::Lofty,
            Self::RealT,
            Self::Reental,
            Self::Fraxtor,
            Self::Binaryx,
        ]
    }

    /// Identifier used in configuration, directory names and record `source_id`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lofty => "lofty",
            Self::RealT => "realt",
            Self::Reental => "reental",
            Self::Fraxtor => "fraxtor",
            Self::Binaryx => "binaryx",
        }
    }

    /// Parses a source identifier, ignoring case
    ///
    /// Returns None if the name doesn't match any built-in source.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::all()
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Human-readable site name carried in record `source_name`
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Lofty => "Lofty.ai",
            Self::RealT => "RealT",
            Self::Reental => "Reental.co",
            Self::Fraxtor => "Fraxtor",
            Self::Binaryx => "Binaryx",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Lofty => "https://www.lofty.ai",
            Self::RealT => "https://realt.co",
            Self::Reental => "https://www.reental.co",
            Self::Fraxtor => "https://www.fraxtor.com",
            Self::Binaryx => "https://www.binaryx.com",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-run inputs an extractor needs besides the session
#[derive(Debug, Clone)]
pub struct ExtractContext {
    /// Upper bound on scroll rounds while materializing an index page
    pub max_scroll_rounds: u32,
    /// Wait after each scroll round
    pub settle_delay: Duration,
    /// Destination for ancillary documents
    pub documents: DocumentStore,
}

/// The per-source extraction contract
#[async_trait]
pub trait SourceExtractor: Send + Sync {
    fn kind(&self) -> SourceKind;

    fn source_id(&self) -> &'static str {
        self.kind().name()
    }

    fn source_name(&self) -> &'static str {
        self.kind().display_name()
    }

    /// Item endpoints on the index page, distinct and in first-seen order
    ///
    /// An empty list is a valid result. Failing to load the index page is an error.
    async fn enumerate(
        &self,
        session: &mut dyn Session,
        ctx: &ExtractContext,
    ) -> Result<Vec<String>>;

    /// One normalized record for `endpoint`
    ///
    /// Missing fields are omitted from the record; only failing to load the item
    /// page is an error.
    async fn fetch_detail(
        &self,
        session: &mut dyn Session,
        endpoint: &str,
        ctx: &ExtractContext,
    ) -> Result<Record>;
}

/// Builds the extractor for `kind`, optionally rooted at another site URL
pub fn build_extractor(kind: SourceKind, base_url: Option<&str>) -> Result<Arc<dyn SourceExtractor>> {
    let raw = base_url.unwrap_or(kind.default_base_url());
    let base = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", raw, e)))?;

    let extractor: Arc<dyn SourceExtractor> = match kind {
        SourceKind::Lofty => Arc::new(LoftyExtractor::new(base)),
        SourceKind::RealT => Arc::new(SiteExtractor::new(kind, base, &sites::REALT)),
        SourceKind::Reental => Arc::new(SiteExtractor::new(kind, base, &sites::REENTAL)),
        SourceKind::Fraxtor => Arc::new(SiteExtractor::new(kind, base, &sites::FRAXTOR)),
        SourceKind::Binaryx => Arc::new(SiteExtractor::new(kind, base, &sites::BINARYX)),
    };
    Ok(extractor)
}

/// A source ready to run: its extractor plus the session options it needs
#[derive(Clone)]
pub struct SourcePlan {
    pub extractor: Arc<dyn SourceExtractor>,
    pub options: SessionOptions,
}

impl SourcePlan {
    pub fn new(extractor: Arc<dyn SourceExtractor>, options: SessionOptions) -> Self {
        Self { extractor, options }
    }

    /// Plan for one configured source entry
    pub fn from_entry(entry: &SourceEntry) -> Result<Self> {
        let kind = SourceKind::from_name(&entry.kind)
            .ok_or_else(|| ConfigError::UnknownSource(entry.kind.clone()))?;
        let extractor = build_extractor(kind, entry.base_url.as_deref())?;

        Ok(Self::new(
            extractor,
            SessionOptions {
                use_proxy: entry.use_proxy,
            },
        ))
    }

    pub fn source_id(&self) -> &'static str {
        self.extractor.source_id()
    }

    pub fn source_name(&self) -> &'static str {
        self.extractor.source_name()
    }
}

impl fmt::Debug for SourcePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourcePlan")
            .field("source", &self.source_id())
            .field("options", &self.options)
            .finish()
    }
}
