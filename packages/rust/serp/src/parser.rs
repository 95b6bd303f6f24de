//! DataForSEO response parsing.
//!
//! The API wraps every call in an envelope:
//! - top level: `status_code`, `status_message`, `tasks`
//! - per task: `status_code`, `status_message`, `result`
//!
//! `20000` means success at both levels. Live SERP results carry a mixed
//! `items` list (organic, ads, featured snippets, ...); only `organic` items
//! are kept.

use serde::Deserialize;
use serde_json::Value;

use serprank_shared::{Result, SerpEntry, SerpRankError};

/// DataForSEO success status code.
pub(crate) const STATUS_OK: u32 = 20000;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope {
    status_code: u32,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
struct Task {
    status_code: u32,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    result: Option<Vec<Value>>,
}

/// Validate both status levels and return the first task's results.
fn task_results(body: &str) -> Result<Vec<Value>> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| SerpRankError::parse(format!("invalid DataForSEO response: {e}")))?;

    if envelope.status_code != STATUS_OK {
        return Err(SerpRankError::Serp(format!(
            "API error {}: {}",
            envelope.status_code, envelope.status_message
        )));
    }

    let task = envelope
        .tasks
        .into_iter()
        .next()
        .ok_or_else(|| SerpRankError::Serp("response contained no tasks".into()))?;

    if task.status_code != STATUS_OK {
        return Err(SerpRankError::Serp(format!(
            "task error {}: {}",
            task.status_code, task.status_message
        )));
    }

    Ok(task.result.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Organic results
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SerpResult {
    #[serde(default)]
    items: Option<Vec<SerpItem>>,
}

#[derive(Debug, Deserialize)]
struct SerpItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    rank_group: Option<u32>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    breadcrumb: Option<String>,
    #[serde(default)]
    website_name: Option<String>,
}

/// Parse a live-advanced SERP response into organic entries in result order.
///
/// Items without a URL are dropped. At most `depth` entries are returned. An
/// item without a `rank_group` takes its 1-based index among the kept items.
pub(crate) fn parse_organic(body: &str, depth: usize) -> Result<Vec<SerpEntry>> {
    let Some(first) = task_results(body)?.into_iter().next() else {
        return Ok(Vec::new());
    };

    let result: SerpResult = serde_json::from_value(first)
        .map_err(|e| SerpRankError::parse(format!("unexpected SERP result shape: {e}")))?;

    let entries = result
        .items
        .unwrap_or_default()
        .into_iter()
        .filter(|item| item.kind == "organic")
        .filter(|item| item.url.as_deref().is_some_and(|u| !u.trim().is_empty()))
        .take(depth)
        .enumerate()
        .filter_map(|(idx, item)| into_entry(item, idx as u32 + 1))
        .collect();

    Ok(entries)
}

fn into_entry(item: SerpItem, fallback_position: u32) -> Option<SerpEntry> {
    let url = item.url.filter(|u| !u.trim().is_empty())?;

    let mut entry = SerpEntry::new(
        item.rank_group.unwrap_or(fallback_position),
        url,
        item.title.unwrap_or_default(),
        item.description.unwrap_or_default(),
    );
    if let Some(domain) = item.domain.filter(|d| !d.is_empty()) {
        entry.domain = domain;
    }
    entry.breadcrumb = item.breadcrumb.filter(|b| !b.is_empty());
    entry.website_name = item.website_name.filter(|w| !w.is_empty());

    Some(entry)
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// One entry from the locations listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    pub location_code: u32,
    pub location_name: String,
    #[serde(default)]
    pub country_iso_code: Option<String>,
    #[serde(default)]
    pub location_type: Option<String>,
}

/// Parse the locations listing.
pub(crate) fn parse_locations(body: &str) -> Result<Vec<Location>> {
    task_results(body)?
        .into_iter()
        .map(|v| {
            serde_json::from_value(v)
                .map_err(|e| SerpRankError::parse(format!("unexpected location shape: {e}")))
        })
        .collect()
}
