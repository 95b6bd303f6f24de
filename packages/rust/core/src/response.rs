//! Boundary response shape and the results digest.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use serprank_shared::{CrawlStatus, RankedResult, SearchId, SearchSummary};

/// Complete response for one search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub search_id: SearchId,
    pub searched_at: DateTime<Utc>,
    pub query: String,
    pub location: String,
    pub language: String,
    pub results: Vec<ResultItem>,
    pub metadata: ResponseMetadata,
}

/// One ranked result as exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub rank: usize,
    pub serp_position: u32,
    pub url: String,
    pub domain: String,
    pub serp_title: String,
    pub serp_snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_name: Option<String>,
    pub title: String,
    pub description: String,
    pub content: String,
    pub headings: Vec<String>,
    pub ranking_score: f64,
    pub word_count: usize,
    pub crawl_status: CrawlStatus,
    /// HTTP status of the page fetch; absent when no response was received.
    pub crawl_status_code: Option<u16>,
}

impl From<RankedResult> for ResultItem {
    fn from(r: RankedResult) -> Self {
        Self {
            rank: r.rank,
            serp_position: r.original_position,
            url: r.serp.url,
            domain: r.serp.domain,
            serp_title: r.serp.title,
            serp_snippet: r.serp.snippet,
            breadcrumb: r.serp.breadcrumb,
            website_name: r.serp.website_name,
            title: r.crawl.title.unwrap_or_default(),
            description: r.crawl.meta_description.unwrap_or_default(),
            content: r.crawl.content.unwrap_or_default(),
            headings: r.crawl.headings,
            ranking_score: r.score,
            word_count: r.crawl.word_count,
            crawl_status: r.crawl.status,
            crawl_status_code: r.crawl.http_code,
        }
    }
}

/// Timing and outcome counters for the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub total_time_seconds: f64,
    pub crawl_time_seconds: f64,
    pub ranking_time_seconds: f64,
    pub serp_count: usize,
    pub successful_crawls: usize,
    /// True only when the external ranking service scored the results.
    pub google_ranking_api_used: bool,
}

impl ResponseMetadata {
    /// Build from a pipeline summary, with times rounded to hundredths.
    pub fn from_summary(summary: &SearchSummary, total_time_seconds: f64) -> Self {
        Self {
            total_time_seconds: round2(total_time_seconds),
            crawl_time_seconds: round2(summary.crawl_time_seconds),
            ranking_time_seconds: round2(summary.ranking_time_seconds),
            serp_count: summary.serp_count,
            successful_crawls: summary.successful_crawls,
            google_ranking_api_used: summary.scorer_used,
        }
    }
}

fn round2(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

/// Short summary of a response for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDigest {
    pub query: String,
    pub total_results: usize,
    /// Results with a score above zero.
    pub successfully_ranked: usize,
    pub top_ranked_url: Option<String>,
    pub top_ranking_score: f64,
    /// Mean score of the successfully ranked results, 3 decimals.
    pub average_ranking_score: f64,
    pub domains_found: usize,
    pub total_word_count: usize,
    pub processing_time: f64,
}

/// Summarize a response.
pub fn digest(response: &SearchResponse) -> SearchDigest {
    let ranked: Vec<&ResultItem> = response
        .results
        .iter()
        .filter(|r| r.ranking_score > 0.0)
        .collect();

    let average_ranking_score = if ranked.is_empty() {
        0.0
    } else {
        let mean = ranked.iter().map(|r| r.ranking_score).sum::<f64>() / ranked.len() as f64;
        (mean * 1000.0).round() / 1000.0
    };

    let domains: HashSet<&str> = response
        .results
        .iter()
        .map(|r| r.domain.as_str())
        .filter(|d| !d.is_empty())
        .collect();

    SearchDigest {
        query: response.query.clone(),
        total_results: response.results.len(),
        successfully_ranked: ranked.len(),
        top_ranked_url: ranked.first().map(|r| r.url.clone()),
        top_ranking_score: ranked.first().map_or(0.0, |r| r.ranking_score),
        average_ranking_score,
        domains_found: domains.len(),
        total_word_count: response.results.iter().map(|r| r.word_count).sum(),
        processing_time: response.metadata.total_time_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serprank_shared::{CrawlResult, SerpEntry};

    fn item(rank: usize, url: &str, domain: &str, score: f64, words: usize) -> ResultItem {
        ResultItem {
            rank,
            serp_position: rank as u32,
            url: url.into(),
            domain: domain.into(),
            serp_title: String::new(),
            serp_snippet: String::new(),
            breadcrumb: None,
            website_name: None,
            title: String::new(),
            description: String::new(),
            content: String::new(),
            headings: Vec::new(),
            ranking_score: score,
            word_count: words,
            crawl_status: if score > 0.0 {
                CrawlStatus::Success
            } else {
                CrawlStatus::Timeout
            },
            crawl_status_code: None,
        }
    }

    fn response(results: Vec<ResultItem>) -> SearchResponse {
        SearchResponse {
            search_id: SearchId::new(),
            searched_at: Utc::now(),
            query: "rust async".into(),
            location: "United States".into(),
            language: "en".into(),
            results,
            metadata: ResponseMetadata {
                total_time_seconds: 4.2,
                crawl_time_seconds: 3.0,
                ranking_time_seconds: 0.5,
                serp_count: 3,
                successful_crawls: 2,
                google_ranking_api_used: false,
            },
        }
    }

    #[test]
    fn digest_counts_ranked_results() {
        let resp = response(vec![
            item(1, "https://a.test/1", "a.test", 0.9, 100),
            item(2, "https://a.test/2", "a.test", 0.4, 50),
            item(3, "https://b.test", "b.test", 0.0, 0),
        ]);
        let d = digest(&resp);

        assert_eq!(d.total_results, 3);
        assert_eq!(d.successfully_ranked, 2);
        assert_eq!(d.top_ranked_url.as_deref(), Some("https://a.test/1"));
        assert_eq!(d.top_ranking_score, 0.9);
        assert_eq!(d.average_ranking_score, 0.65);
        assert_eq!(d.domains_found, 2);
        assert_eq!(d.total_word_count, 150);
        assert_eq!(d.processing_time, 4.2);
    }

    #[test]
    fn digest_of_empty_response() {
        let d = digest(&response(Vec::new()));
        assert_eq!(d.total_results, 0);
        assert_eq!(d.successfully_ranked, 0);
        assert!(d.top_ranked_url.is_none());
        assert_eq!(d.average_ranking_score, 0.0);
    }

    #[test]
    fn response_serializes_boundary_fields() {
        let resp = response(vec![item(1, "https://a.test", "a.test", 0.5, 10)]);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["query"], "rust async");
        assert_eq!(json["results"][0]["crawl_status"], "success");
        assert_eq!(json["results"][0]["serp_position"], 1);
        assert_eq!(json["metadata"]["google_ranking_api_used"], false);
        assert!(json["search_id"].is_string());
        assert!(json["results"][0].get("breadcrumb").is_none());

        let mut with_serp_extras = item(1, "https://a.test", "a.test", 0.5, 10);
        with_serp_extras.breadcrumb = Some("a.test › guides".into());
        with_serp_extras.website_name = Some("A Test".into());
        let json = serde_json::to_value(response(vec![with_serp_extras])).unwrap();
        assert_eq!(json["results"][0]["breadcrumb"], "a.test › guides");
        assert_eq!(json["results"][0]["website_name"], "A Test");
    }

    #[test]
    fn result_item_carries_serp_breadcrumb_and_site_name() {
        let mut serp = SerpEntry::new(3, "https://www.ibm.com/topics/ai", "What is AI?", "snippet");
        serp.breadcrumb = Some("https://www.ibm.com › topics".into());
        serp.website_name = Some("IBM".into());

        let ranked = RankedResult {
            crawl: CrawlResult::failed(serp.url.clone(), CrawlStatus::Timeout, None),
            serp,
            score: 0.0,
            rank: 1,
            original_position: 3,
        };
        let item = ResultItem::from(ranked);

        assert_eq!(item.serp_position, 3);
        assert_eq!(item.breadcrumb.as_deref(), Some("https://www.ibm.com › topics"));
        assert_eq!(item.website_name.as_deref(), Some("IBM"));
        assert_eq!(item.domain, "www.ibm.com");
    }

    #[test]
    fn metadata_rounds_times() {
        let summary = SearchSummary {
            query: "q".into(),
            total_time_seconds: 1.23456,
            crawl_time_seconds: 0.98765,
            ranking_time_seconds: 0.001,
            serp_count: 1,
            successful_crawls: 1,
            scorer_used: true,
        };
        let meta = ResponseMetadata::from_summary(&summary, 2.345_67);
        assert_eq!(meta.total_time_seconds, 2.35);
        assert_eq!(meta.crawl_time_seconds, 0.99);
        assert_eq!(meta.ranking_time_seconds, 0.0);
        assert!(meta.google_ranking_api_used);
    }
}
