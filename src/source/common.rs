//! Helpers shared by every extractor

use crate::session::{Element, Session};
use crate::store::DocumentStore;
use regex::Regex;
use url::Url;

/// Distinct hrefs of `links`, in first-seen order
///
/// When `scope` is given, only links on the same site are kept.
pub fn collect_endpoints(links: &[Element], scope: Option<&Url>) -> Vec<String> {
    let mut endpoints: Vec<String> = Vec::new();

    for href in links.iter().filter_map(Element::href) {
        if let Some(base) = scope {
            if !same_site(href, base) {
                continue;
            }
        }
        if !endpoints.iter().any(|seen| seen == href) {
            endpoints.push(href.to_string());
        }
    }

    endpoints
}

/// Distinct links whose URL path names a PDF, query strings and fragments ignored
pub fn pdf_links(links: &[Element]) -> Vec<String> {
    collect_endpoints(links, None)
        .into_iter()
        .filter(|href| {
            Url::parse(href)
                .map(|url| url.path().to_ascii_lowercase().ends_with(".pdf"))
                .unwrap_or(false)
        })
        .collect()
}

/// True if `link` has the same host and port as `base`
pub fn same_site(link: &str, base: &Url) -> bool {
    match Url::parse(link) {
        Ok(url) => {
            url.host_str() == base.host_str()
                && url.port_or_known_default() == base.port_or_known_default()
        }
        Err(_) => false,
    }
}

/// First capture group of `pattern` in `text`, or the whole match if it has none
pub fn capture(pattern: &Regex, text: &str) -> Option<String> {
    let caps = pattern.captures(text)?;
    let matched = caps.get(1).or_else(|| caps.get(0))?;
    Some(matched.as_str().to_string())
}

/// At most `max` characters of `text`
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Document category from a link's label and target
///
/// Labels are checked in priority order; links served from the listing's own
/// asset host default to an offering document.
pub fn classify_document(label: &str, href: &str, asset_host: &str) -> &'static str {
    let label = label.to_lowercase();
    let href_lower = href.to_lowercase();
    let has = |needle: &str| label.contains(needle);

    if has("appraisal") || href_lower.contains("appraisal") {
        "appraisal"
    } else if has("inspection") {
        "inspection"
    } else if has("lease") {
        "lease"
    } else if has("insurance") {
        "insurance"
    } else if has("loan") || has("mortgage") {
        "loan_documents"
    } else if has("management") {
        "property_management"
    } else if has("operating agreement") {
        "operating_agreement"
    } else if has("llc") {
        "llc_documents"
    } else if has("title") || has("deed") {
        "title_documents"
    } else if has("transaction") {
        "transaction_data"
    } else if href_lower.contains(asset_host) {
        "offering_document"
    } else {
        "unknown"
    }
}

/// File extension for a downloaded document
///
/// Uses the URL path's extension when it looks like one, otherwise `fallback`.
pub fn document_extension(href: &str, fallback: &str) -> String {
    let ext = Url::parse(href).ok().and_then(|url| {
        let last = url.path_segments()?.last()?.to_string();
        let (_, ext) = last.rsplit_once('.')?;
        let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
        valid.then(|| ext.to_ascii_lowercase())
    });

    ext.unwrap_or_else(|| fallback.to_string())
}

/// One ancillary document to download for a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    pub url: String,
    /// Sequence number or document type used in the file name
    pub suffix: String,
    pub ext: String,
}

/// Downloads every document and stores it under the source's document directory
///
/// Failures are logged and skipped. Returns the number of documents stored.
pub async fn download_documents(
    session: &mut dyn Session,
    store: &DocumentStore,
    record_id: &str,
    links: &[DocumentLink],
) -> usize {
    let mut saved = 0;

    for link in links {
        let bytes = match session.fetch_binary(&link.url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping document {}: {}", link.url, e);
                continue;
            }
        };

        match store.save(record_id, &link.suffix, &link.ext, &bytes) {
            Ok(path) => {
                tracing::debug!("Downloaded {} -> {}", link.url, path.display());
                saved += 1;
            }
            Err(e) => tracing::warn!("Failed to store document {}: {}", link.url, e),
        }
    }

    saved
}
