//! Normalization of loosely shaped listings into [`RawOpportunity`].

use genie_core::{Compensation, FeedSource, RawOpportunity};
use serde_json::Value;

use crate::error::ScraperError;

/// The array of listings at `items_path` (dot-separated) inside `document`.
///
/// # Errors
///
/// Returns [`ScraperError::Normalization`] if the path is missing or does
/// not lead to an array.
pub fn extract_items<'a>(
    source_name: &str,
    document: &'a Value,
    items_path: Option<&str>,
) -> Result<&'a [Value], ScraperError> {
    let mut node = document;
    if let Some(path) = items_path.filter(|p| !p.is_empty()) {
        for segment in path.split('.') {
            node = node.get(segment).ok_or_else(|| ScraperError::Normalization {
                source_name: source_name.to_owned(),
                reason: format!("items path '{path}' has no '{segment}'"),
            })?;
        }
    }

    node.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ScraperError::Normalization {
            source_name: source_name.to_owned(),
            reason: "listings are not an array".to_owned(),
        })
}

/// Map one feed listing onto a [`RawOpportunity`].
///
/// Title and URL are required. Relative URLs are resolved against the feed
/// URL. A listing is remote if its remote field is truthy or its location
/// says "remote". The listing itself is kept as `raw_data`.
///
/// # Errors
///
/// Returns [`ScraperError::Normalization`] if the title or URL is missing
/// or the URL cannot be resolved.
pub fn normalize_listing(feed: &FeedSource, listing: &Value) -> Result<RawOpportunity, ScraperError> {
    let fail = |reason: String| ScraperError::Normalization {
        source_name: feed.name.clone(),
        reason,
    };
    let fields = &feed.fields;

    let title = text(listing, &fields.title)
        .ok_or_else(|| fail(format!("listing has no '{}'", fields.title)))?;
    let link = text(listing, &fields.url)
        .ok_or_else(|| fail(format!("listing '{title}' has no '{}'", fields.url)))?;
    let source_url = resolve_url(&feed.url, &link)
        .ok_or_else(|| fail(format!("listing '{title}' has an invalid url '{link}'")))?;

    let location = text(listing, &fields.location);
    let remote = truthy(listing.get(&fields.remote))
        || location
            .as_deref()
            .is_some_and(|l| l.to_lowercase().contains("remote"));

    Ok(RawOpportunity {
        title,
        description: text(listing, &fields.description),
        source_url,
        source_name: feed.name.clone(),
        opportunity_type: feed.opportunity_type,
        location,
        remote,
        compensation: listing
            .get(&fields.compensation)
            .cloned()
            .and_then(Compensation::from_value),
        tags: tags(listing.get(&fields.tags)),
        raw_data: listing.clone(),
    })
}

fn text(listing: &Value, key: &str) -> Option<String> {
    listing
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}

fn tags(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<&str> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => s.split(',').collect(),
        _ => Vec::new(),
    };
    raw.into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

fn resolve_url(base: &str, link: &str) -> Option<String> {
    let url = match reqwest::Url::parse(link) {
        Ok(url) => url,
        Err(_) => reqwest::Url::parse(base).ok()?.join(link).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
