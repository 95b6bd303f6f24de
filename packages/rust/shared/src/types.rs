//! Core domain types for a single search request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SearchId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one search request (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchId(pub Uuid);

impl SearchId {
    /// Generate a new time-sortable search identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SearchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SearchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SearchId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// SerpEntry
// ---------------------------------------------------------------------------

/// One organic result from the SERP source, in original search order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerpEntry {
    /// 1-based organic position on the results page.
    pub position: u32,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_name: Option<String>,
}

impl SerpEntry {
    /// Build an entry with only the required fields set.
    pub fn new(
        position: u32,
        url: impl Into<String>,
        title: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let domain = url::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        Self {
            position,
            url,
            title: title.into(),
            snippet: snippet.into(),
            domain,
            breadcrumb: None,
            website_name: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CrawlResult
// ---------------------------------------------------------------------------

/// Outcome of fetching and extracting one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    Success,
    Timeout,
    HttpError,
    ParseError,
}

impl CrawlStatus {
    /// Wire name used in the JSON response.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Timeout => "timeout",
            Self::HttpError => "http_error",
            Self::ParseError => "parse_error",
        }
    }
}

impl std::fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crawl outcome for a single URL. Exactly one per SERP entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub url: String,
    pub status: CrawlStatus,
    /// HTTP status code, when a response was received at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    /// Normalized page text, bounded by the crawl's `max_content_length`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub headings: Vec<String>,
    pub word_count: usize,
}

impl CrawlResult {
    /// A failed crawl carrying no content.
    pub fn failed(url: impl Into<String>, status: CrawlStatus, http_code: Option<u16>) -> Self {
        Self {
            url: url.into(),
            status,
            http_code,
            title: None,
            meta_description: None,
            content: None,
            headings: Vec::new(),
            word_count: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CrawlStatus::Success
    }
}

// ---------------------------------------------------------------------------
// RankedResult / SearchSummary
// ---------------------------------------------------------------------------

/// A SERP entry joined with its crawl outcome and relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub serp: SerpEntry,
    pub crawl: CrawlResult,
    /// Relevance in `[0, 1]`.
    pub score: f64,
    /// 1-based position after sorting by score.
    pub rank: usize,
    pub original_position: u32,
}

/// Aggregate metadata for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub query: String,
    pub total_time_seconds: f64,
    pub crawl_time_seconds: f64,
    pub ranking_time_seconds: f64,
    pub serp_count: usize,
    pub successful_crawls: usize,
    /// True only when the external ranking service scored the whole batch.
    pub scorer_used: bool,
}
