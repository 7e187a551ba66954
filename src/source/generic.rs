//! Profile-driven extractor for sites that share one page structure
//!
//! These sites list items as plain links on an index page and present details as
//! label/value pairs, so one extractor parameterized by a [`SiteProfile`] covers
//! them all.

use super::common::{
    collect_endpoints, download_documents, pdf_links, truncate_chars, DocumentLink,
};
use super::{ExtractContext, SourceExtractor, SourceKind};
use crate::record::{Record, RecordBuilder};
use crate::session::{LabelQuery, LabelScope, Session};
use crate::Result;
use async_trait::async_trait;
use url::Url;

/// Words that mark site boilerplate rather than listings
const BOILERPLATE: [&str; 6] = ["about", "contact", "terms", "privacy", "login", "signup"];

/// One label-driven field
#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    pub field: &'static str,
    pub needles: &'static [&'static str],
    pub scope: LabelScope,
    /// At least one of these must appear in the value; empty accepts anything
    pub require: &'static [&'static str],
}

impl LabelRule {
    fn query(&self) -> LabelQuery<'static> {
        LabelQuery {
            needles: self.needles,
            scope: self.scope,
            require: self.require,
        }
    }
}

/// Everything that differs between profile-driven sites
#[derive(Debug)]
pub struct SiteProfile {
    /// Index page, relative to the base URL ("" for the site root)
    pub index_path: &'static str,
    /// Links to item pages on the index
    pub item_selector: &'static str,
    /// Index text that means the site refused to serve us
    pub block_markers: &'static [&'static str],
    /// Fall back to any non-boilerplate same-site link when nothing matches
    pub fallback_links: bool,
    /// Also store the title as `address`
    pub title_is_address: bool,
    pub labels: &'static [LabelRule],
    /// Labels collected into one `property_details` summary
    pub summary_needles: &'static [&'static str],
    /// Image URLs must contain this to be kept
    pub image_marker: Option<&'static str>,
    pub image_limit: usize,
    pub description_limit: usize,
}

/// Extractor for one site described by a [`SiteProfile`]
#[derive(Debug, Clone)]
pub struct SiteExtractor {
    kind: SourceKind,
    base: Url,
    profile: &'static SiteProfile,
}

impl SiteExtractor {
    pub fn new(kind: SourceKind, base: Url, profile: &'static SiteProfile) -> Self {
        Self {
            kind,
            base,
            profile,
        }
    }

    fn index_url(&self) -> String {
        if self.profile.index_path.is_empty() {
            return self.base.to_string();
        }
        self.base
            .join(self.profile.index_path)
            .map(String::from)
            .unwrap_or_else(|_| self.base.to_string())
    }

    fn is_blocked(&self, html: &str) -> bool {
        let lower = html.to_lowercase();
        self.profile
            .block_markers
            .iter()
            .any(|marker| lower.contains(marker))
    }

    fn fallback_endpoints(&self, hrefs: Vec<String>) -> Vec<String> {
        let root = self.base.as_str().trim_end_matches('/');
        hrefs
            .into_iter()
            .filter(|href| href.trim_end_matches('/') != root)
            .filter(|href| {
                let lower = href.to_lowercase();
                !BOILERPLATE.iter().any(|word| lower.contains(word))
            })
            .collect()
    }
}

#[async_trait]
impl SourceExtractor for SiteExtractor {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn enumerate(
        &self,
        session: &mut dyn Session,
        ctx: &ExtractContext,
    ) -> Result<Vec<String>> {
        let url = self.index_url();
        session.navigate(&url).await?;

        if !self.profile.block_markers.is_empty() {
            let html = session.html().await?;
            if self.is_blocked(&html) {
                tracing::warn!(
                    "{} appears to be blocking access; route it through a proxy (PROXY_URL, use-proxy = true)",
                    self.source_name()
                );
                return Ok(Vec::new());
            }
        }

        session
            .scroll_to_exhaustion(ctx.max_scroll_rounds, ctx.settle_delay)
            .await;

        let links = session.extract_all(self.profile.item_selector).await;
        let endpoints = collect_endpoints(&links, Some(&self.base));

        if endpoints.is_empty() && self.profile.fallback_links {
            let all = session.extract_all("a[href]").await;
            let candidates = collect_endpoints(&all, Some(&self.base));
            let fallback = self.fallback_endpoints(candidates);
            tracing::debug!(
                "{}: no item links matched, using {} fallback links",
                self.source_id(),
                fallback.len()
            );
            return Ok(fallback);
        }

        Ok(endpoints)
    }

    async fn fetch_detail(
        &self,
        session: &mut dyn Session,
        endpoint: &str,
        ctx: &ExtractContext,
    ) -> Result<Record> {
        session.navigate(endpoint).await?;

        let mut record = RecordBuilder::new(self.source_id(), self.source_name(), endpoint);
        let record_id = record.current_record_id();

        let title = session.extract_text("h1").await;
        if self.profile.title_is_address {
            record.insert("address", title.clone());
        }
        record.insert("title", title);

        for rule in self.profile.labels {
            record.insert(rule.field, session.extract_labeled(rule.query()).await);
        }

        if !self.profile.summary_needles.is_empty() {
            let details = session
                .extract_labeled_all(LabelQuery::own(self.profile.summary_needles))
                .await;
            if !details.is_empty() {
                let summary: Vec<String> = details.into_iter().take(5).collect();
                record.insert("property_details", Some(summary.join(" | ")));
            }
        }

        record.insert(
            "full_description",
            session
                .page_text()
                .await
                .map(|text| truncate_chars(&text, self.profile.description_limit)),
        );

        let images: Vec<String> = session
            .extract_all("img")
            .await
            .iter()
            .take(self.profile.image_limit)
            .filter_map(|img| img.src())
            .filter(|src| self.profile.image_marker.map_or(true, |m| src.contains(m)))
            .map(str::to_string)
            .collect();
        record.insert("images", Some(images));

        let documents = pdf_links(&session.extract_all("a[href]").await);
        let downloads: Vec<DocumentLink> = documents
            .iter()
            .enumerate()
            .map(|(i, url)| DocumentLink {
                url: url.clone(),
                suffix: (i + 1).to_string(),
                ext: "pdf".to_string(),
            })
            .collect();
        record.insert("documents", Some(documents));

        download_documents(session, &ctx.documents, &record_id, &downloads).await;

        Ok(record.build())
    }
}
