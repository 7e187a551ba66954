//! Document queries over a rendered page
//!
//! Every function here parses the serialized DOM it is given and returns owned
//! values, so no parsed tree outlives the call. Invalid selectors and missing
//! elements produce absent values.

use super::Element;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Where the text of a labelled element is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelScope {
    /// The labelled element itself
    Own,
    /// The labelled element's parent (label plus value)
    Parent,
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::debug!("Invalid selector {:?}: {:?}", selector, e);
            None
        }
    }
}

/// Visible text runs under `element`, skipping script and style content
fn text_runs<'a>(element: ElementRef<'a>) -> Vec<&'a str> {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent()?;
            if let Some(parent) = parent.value().as_element() {
                if matches!(parent.name(), "script" | "style" | "noscript" | "template") {
                    return None;
                }
            }
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        })
        .collect()
}

fn inline_text(element: ElementRef<'_>) -> String {
    text_runs(element)
        .iter()
        .flat_map(|run| run.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first element matching `selector`
pub fn select_text(html: &str, selector: &str) -> Option<String> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .map(inline_text)
        .find(|text| !text.is_empty())
}

/// Every element matching `selector`
///
/// `href` and `src` are resolved against `base_url` when one is given; links that
/// cannot be resolved to http(s) are dropped from the attribute map.
pub fn select_all(html: &str, selector: &str, base_url: Option<&str>) -> Vec<Element> {
    let Some(selector) = parse_selector(selector) else {
        return Vec::new();
    };
    let base = base_url.and_then(|u| Url::parse(u).ok());
    let document = Html::parse_document(html);

    document
        .select(&selector)
        .map(|element| {
            let attrs = element
                .value()
                .attrs()
                .filter_map(|(name, value)| {
                    let value = match (name, &base) {
                        ("href" | "src", Some(base)) => resolve_link(value, base)?,
                        _ => value.to_string(),
                    };
                    Some((name.to_string(), value))
                })
                .collect();

            Element {
                tag: element.value().name().to_string(),
                text: inline_text(element),
                attrs,
            }
        })
        .collect()
}

/// Visible text of `<body>`, one text run per line
pub fn body_text(html: &str) -> Option<String> {
    let selector = parse_selector("body")?;
    let document = Html::parse_document(html);
    let body = document.select(&selector).next()?;

    let text = text_runs(body).join("\n");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Texts of every element whose own text contains any of `needles`
///
/// With [`LabelScope::Parent`] the parent's text is taken instead. Candidates
/// lacking all of the `require` markers are skipped; an empty `require` accepts
/// everything.
pub fn labeled_texts(
    html: &str,
    needles: &[&str],
    scope: LabelScope,
    require: &[&str],
) -> Vec<String> {
    let Some(selector) = parse_selector("body *") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let mut found = Vec::new();

    for element in document.select(&selector) {
        if matches!(element.value().name(), "script" | "style" | "noscript") {
            continue;
        }

        let labelled = element
            .children()
            .filter_map(|child| child.value().as_text())
            .any(|text| needles.iter().any(|needle| text.contains(needle)));
        if !labelled {
            continue;
        }

        let target = match scope {
            LabelScope::Own => Some(element),
            LabelScope::Parent => element.parent().and_then(ElementRef::wrap),
        };
        let Some(target) = target else {
            continue;
        };

        let text = inline_text(target);
        if text.is_empty() {
            continue;
        }
        if require.is_empty() || require.iter().any(|marker| text.contains(marker)) {
            found.push(text);
        }
    }

    found
}

/// First result of [`labeled_texts`]
pub fn labeled_text(
    html: &str,
    needles: &[&str],
    scope: LabelScope,
    require: &[&str],
) -> Option<String> {
    labeled_texts(html, needles, scope, require).into_iter().next()
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None for empty hrefs, fragment-only anchors, `javascript:`, `mailto:`,
/// `tel:` and `data:` links, and anything that does not resolve to http(s).
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
