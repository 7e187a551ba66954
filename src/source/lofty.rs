//! Lofty.ai marketplace extractor
//!
//! The marketplace is an infinite-scroll grid of `/property_deal/` links. Detail
//! pages carry most facts as free text, so fields are captured with patterns over
//! the page body; documents are Dropbox or asset-host links classified by label.

use super::common::{
    capture, classify_document, collect_endpoints, document_extension, download_documents,
    truncate_chars, DocumentLink,
};
use super::{ExtractContext, SourceExtractor, SourceKind};
use crate::record::{Record, RecordBuilder};
use crate::session::Session;
use crate::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;
use url::Url;

const ITEM_SELECTOR: &str = "a[href*='/property_deal/']";
const IMAGE_SELECTOR: &str = "img[src*='images.lofty.ai']";
const ASSET_HOST: &str = "asset.lofty.ai";
const DOCUMENT_HOSTS: [&str; 2] = ["dropbox.com", ASSET_HOST];
const IMAGE_LIMIT: usize = 10;
const DESCRIPTION_LIMIT: usize = 2000;

/// How a captured value is written into the record
#[derive(Debug, Clone, Copy)]
enum Shape {
    Plain,
    Dollars,
    Percent,
}

struct FieldPattern {
    field: &'static str,
    regex: Regex,
    shape: Shape,
}

const PATTERNS: [(&str, &str, Shape); 14] = [
    (
        "estimated_price",
        r"(?i)Estimated Price[^$]*\$([0-9,]+\.?\d*)",
        Shape::Dollars,
    ),
    (
        "projected_annual_return",
        r"(?i)Projected Annual Return[^\d]*([\d.]+)%",
        Shape::Percent,
    ),
    ("rental_yield", r"(?i)Rental Yield[^\d]*([\d.]+)%", Shape::Percent),
    ("bedrooms", r"(\d+)\s*Bed", Shape::Plain),
    ("bathrooms", r"(\d+)\s*Bath", Shape::Plain),
    ("square_feet", r"(\d+)\s*sqft", Shape::Plain),
    (
        "property_type",
        r"(?i)(Single family|Multi-family|Condo|Townhouse)",
        Shape::Plain,
    ),
    ("year_built", r"Built in (\d{4})", Shape::Plain),
    ("monthly_rent", r"\$([0-9,]+)/month", Shape::Dollars),
    ("lease_term", r"(?i)\d+\s*(?:year|month)\s*lease", Shape::Plain),
    ("security_deposit", r"\$([0-9,]+)\s*Security Deposit", Shape::Dollars),
    ("loan_amount", r"(?i)loan of \$([0-9,]+\.?\d*)", Shape::Dollars),
    ("mortgage_rate", r"(?i)(\d+\.\d+)%\s*mortgage", Shape::Percent),
    ("niche_rating", r#""([A-F])".*Rating.*Zip Code"#, Shape::Plain),
];

fn field_patterns() -> &'static [FieldPattern] {
    static COMPILED: OnceLock<Vec<FieldPattern>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|(field, pattern, shape)| match Regex::new(pattern) {
                Ok(regex) => Some(FieldPattern {
                    field,
                    regex,
                    shape: *shape,
                }),
                Err(e) => {
                    tracing::error!("Invalid pattern for {}: {}", field, e);
                    None
                }
            })
            .collect()
    })
}

/// Applies every field pattern to the page text
fn text_fields(page_text: &str) -> Vec<(&'static str, String)> {
    field_patterns()
        .iter()
        .filter_map(|p| {
            let value = capture(&p.regex, page_text)?;
            let value = match p.shape {
                Shape::Plain => value,
                Shape::Dollars => format!("${}", value),
                Shape::Percent => format!("{}%", value),
            };
            Some((p.field, value))
        })
        .collect()
}

/// Extractor for the Lofty.ai marketplace
#[derive(Debug, Clone)]
pub struct LoftyExtractor {
    base: Url,
}

impl LoftyExtractor {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    fn marketplace_url(&self) -> String {
        self.base
            .join("marketplace")
            .map(String::from)
            .unwrap_or_else(|_| format!("{}/marketplace", self.base.as_str().trim_end_matches('/')))
    }
}

#[async_trait]
impl SourceExtractor for LoftyExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Lofty
    }

    async fn enumerate(
        &self,
        session: &mut dyn Session,
        ctx: &ExtractContext,
    ) -> Result<Vec<String>> {
        let url = self.marketplace_url();
        session.navigate(&url).await?;
        session
            .scroll_to_exhaustion(ctx.max_scroll_rounds, ctx.settle_delay)
            .await;

        let links = session.extract_all(ITEM_SELECTOR).await;
        Ok(collect_endpoints(&links, None))
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
        record.insert("title", title.clone());
        record.insert("address", title);
        record.insert("city_state", session.extract_text("h4").await);

        let page_text = session.page_text().await;
        if let Some(text) = &page_text {
            for (field, value) in text_fields(text) {
                record.insert(field, Some(value));
            }
        }

        let mut images: Vec<String> = Vec::new();
        for image in session.extract_all(IMAGE_SELECTOR).await.iter().take(IMAGE_LIMIT) {
            if let Some(src) = image.src() {
                if !images.iter().any(|seen| seen == src) {
                    images.push(src.to_string());
                }
            }
        }
        record.insert("images", Some(images));

        // Documents grouped by type, each downloaded as <id>_<type>_<n>
        let mut grouped: Map<String, Value> = Map::new();
        let mut seen: Vec<String> = Vec::new();
        let mut downloads = Vec::new();

        for anchor in session.extract_all("a[href]").await {
            let Some(href) = anchor.href() else {
                continue;
            };
            if !DOCUMENT_HOSTS.iter().any(|host| href.contains(host)) {
                continue;
            }
            if seen.iter().any(|s| s == href) {
                continue;
            }
            seen.push(href.to_string());

            let doc_type = classify_document(&anchor.text, href, ASSET_HOST);
            let label = if anchor.text.is_empty() {
                doc_type.to_string()
            } else {
                anchor.text.clone()
            };

            let entries = grouped
                .entry(doc_type)
                .or_insert_with(|| Value::Array(Vec::new()));
            let n = match entries {
                Value::Array(list) => {
                    list.push(json!({ "url": href, "label": label }));
                    list.len()
                }
                _ => 1,
            };

            let fallback = if href.contains(ASSET_HOST) { "pdf" } else { "bin" };
            downloads.push(DocumentLink {
                url: href.to_string(),
                suffix: format!("{}_{}", doc_type, n),
                ext: document_extension(href, fallback),
            });
        }

        record.insert("document_count", Some(seen.len()));
        record.insert("documents", Some(Value::Object(grouped)));
        record.insert(
            "full_description",
            page_text.map(|text| truncate_chars(&text, DESCRIPTION_LIMIT)),
        );

        download_documents(session, &ctx.documents, &record_id, &downloads).await;

        Ok(record.build())
    }
}
