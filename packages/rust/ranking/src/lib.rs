//! Relevance scoring for crawled search results.
//!
//! This crate provides:
//! - [`RankingService`]: the seam to an external semantic ranker
//! - [`GoogleRankingClient`]: Discovery Engine implementation of that seam
//! - [`Scorer`]: one batched external call per search, with a whole-batch
//!   lexical fallback ([`fallback::score_fallback`]) when the call fails
//! - [`RankingOutcome`]: scores tagged with how they were produced

pub mod fallback;
mod google;

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use serprank_extract::truncate_at_word_boundary;
use serprank_shared::{CrawlResult, RankingConfig, Result, SerpRankError};

pub use fallback::{round_score, score_fallback};
pub use google::GoogleRankingClient;

/// Longest record title sent to the ranking service.
const MAX_TITLE_CHARS: usize = 200;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Records and items
// ---------------------------------------------------------------------------

/// One document in a ranking request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRecord {
    pub id: String,
    pub title: String,
    pub content: String,
}

impl RankingRecord {
    /// Compose a record from an item, capping the body at `max_chars`.
    pub fn from_item(id: impl Into<String>, item: &ScoreItem, max_chars: usize) -> Self {
        let mut body = String::new();
        if !item.title.is_empty() {
            body.push_str("Title: ");
            body.push_str(&item.title);
            body.push('\n');
        }
        if !item.description.is_empty() {
            body.push_str("Description: ");
            body.push_str(&item.description);
            body.push('\n');
        }
        body.push_str("Content: ");
        body.push_str(&item.content);

        let content = if body.chars().count() > max_chars {
            truncate_at_word_boundary(&body, max_chars)
        } else {
            body
        };

        Self {
            id: id.into(),
            title: item.title.chars().take(MAX_TITLE_CHARS).collect(),
            content,
        }
    }
}

/// A crawled item to be scored against the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreItem {
    pub url: String,
    pub title: String,
    pub description: String,
    pub content: String,
}

impl ScoreItem {
    fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

impl From<&CrawlResult> for ScoreItem {
    fn from(crawl: &CrawlResult) -> Self {
        Self {
            url: crawl.url.clone(),
            title: crawl.title.clone().unwrap_or_default(),
            description: crawl.meta_description.clone().unwrap_or_default(),
            content: crawl.content.clone().unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Service seam
// ---------------------------------------------------------------------------

/// An external semantic ranker.
///
/// Returns a score per record id. Ids missing from the response are treated
/// by [`Scorer`] as a malformed response.
pub trait RankingService: Send + Sync {
    fn rank(
        &self,
        query: &str,
        records: &[RankingRecord],
    ) -> impl Future<Output = Result<HashMap<String, f64>>> + Send;

    /// Human-readable service name for logs.
    fn name(&self) -> &str;

    /// Whether the service has what it needs to accept a call.
    fn is_available(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Per-URL scores, tagged with whether the external service produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum RankingOutcome {
    /// Every content-bearing item was scored by the external service.
    Scored(HashMap<String, f64>),
    /// The whole batch was scored locally.
    DegradedFallback(HashMap<String, f64>),
}

impl RankingOutcome {
    pub fn scores(&self) -> &HashMap<String, f64> {
        match self {
            Self::Scored(s) | Self::DegradedFallback(s) => s,
        }
    }

    pub fn into_scores(self) -> HashMap<String, f64> {
        match self {
            Self::Scored(s) | Self::DegradedFallback(s) => s,
        }
    }

    /// True only when the external ranker scored the batch.
    pub fn scorer_used(&self) -> bool {
        matches!(self, Self::Scored(_))
    }

    /// Score for `url`, 0.0 when the URL was not scored.
    pub fn score_for(&self, url: &str) -> f64 {
        self.scores().get(url).copied().unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Batch scorer: one external call per search, local fallback for the whole
/// batch on any failure.
pub struct Scorer<R> {
    service: R,
    max_record_chars: usize,
    timeout: Duration,
}

impl<R: RankingService> Scorer<R> {
    pub fn new(service: R, config: &RankingConfig) -> Self {
        Self {
            service,
            max_record_chars: config.max_record_chars.max(1),
            timeout: Duration::try_from_secs_f64(config.timeout_secs)
                .ok()
                .filter(|d| !d.is_zero())
                .unwrap_or(DEFAULT_TIMEOUT),
        }
    }

    pub fn service(&self) -> &R {
        &self.service
    }

    /// Score `items` against `query`.
    ///
    /// Items without content score 0.0 and are never sent to the service.
    /// Never fails: degradation is reported through the returned tag.
    #[instrument(skip_all, fields(items = items.len(), service = self.service.name()))]
    pub async fn score(&self, query: &str, items: &[ScoreItem]) -> RankingOutcome {
        let candidates: Vec<&ScoreItem> = items.iter().filter(|i| i.has_content()).collect();

        let outcome = if candidates.is_empty() {
            debug!("no content to rank");
            RankingOutcome::DegradedFallback(HashMap::new())
        } else if !self.service.is_available() {
            warn!("ranking service not configured, using lexical fallback");
            RankingOutcome::DegradedFallback(fallback_scores(query, &candidates))
        } else {
            match self.score_external(query, &candidates).await {
                Ok(scores) => {
                    info!(scored = scores.len(), "external ranking succeeded");
                    RankingOutcome::Scored(scores)
                }
                Err(e) => {
                    warn!(error = %e, "external ranking failed, using lexical fallback");
                    RankingOutcome::DegradedFallback(fallback_scores(query, &candidates))
                }
            }
        };

        with_zero_scores(outcome, items)
    }

    async fn score_external(
        &self,
        query: &str,
        candidates: &[&ScoreItem],
    ) -> Result<HashMap<String, f64>> {
        let records: Vec<RankingRecord> = candidates
            .iter()
            .enumerate()
            .map(|(i, item)| RankingRecord::from_item(i.to_string(), item, self.max_record_chars))
            .collect();

        let raw = timeout(self.timeout, self.service.rank(query, &records))
            .await
            .map_err(|_| {
                SerpRankError::Timeout(format!("ranking exceeded {:?}", self.timeout))
            })??;

        let mut scores = HashMap::with_capacity(candidates.len());
        for (i, item) in candidates.iter().enumerate() {
            let score = raw
                .get(&i.to_string())
                .copied()
                .filter(|s| s.is_finite())
                .ok_or_else(|| {
                    SerpRankError::Ranking(format!("response missing a valid score for record {i}"))
                })?;
            scores.insert(item.url.clone(), round_score(score));
        }

        Ok(scores)
    }
}

fn fallback_scores(query: &str, candidates: &[&ScoreItem]) -> HashMap<String, f64> {
    candidates
        .iter()
        .map(|item| (item.url.clone(), score_fallback(query, &item.content)))
        .collect()
}

/// Give every item without a score an explicit 0.0.
fn with_zero_scores(outcome: RankingOutcome, items: &[ScoreItem]) -> RankingOutcome {
    let fill = |mut scores: HashMap<String, f64>| {
        for item in items {
            scores.entry(item.url.clone()).or_insert(0.0);
        }
        scores
    };

    match outcome {
        RankingOutcome::Scored(s) => RankingOutcome::Scored(fill(s)),
        RankingOutcome::DegradedFallback(s) => RankingOutcome::DegradedFallback(fill(s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns canned per-record scores and records what it was sent.
    struct FixedService {
        scores: Vec<f64>,
        calls: AtomicUsize,
        seen: Mutex<Vec<RankingRecord>>,
    }

    impl FixedService {
        fn new(scores: Vec<f64>) -> Self {
            Self {
                scores,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl RankingService for FixedService {
        async fn rank(
            &self,
            _query: &str,
            records: &[RankingRecord],
        ) -> Result<HashMap<String, f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().extend_from_slice(records);
            Ok(records
                .iter()
                .zip(&self.scores)
                .map(|(r, s)| (r.id.clone(), *s))
                .collect())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingService;

    impl RankingService for FailingService {
        async fn rank(&self, _: &str, _: &[RankingRecord]) -> Result<HashMap<String, f64>> {
            Err(SerpRankError::Ranking("quota exceeded".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct SlowService;

    impl RankingService for SlowService {
        async fn rank(&self, _: &str, records: &[RankingRecord]) -> Result<HashMap<String, f64>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(records.iter().map(|r| (r.id.clone(), 1.0)).collect())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    struct UnconfiguredService;

    impl RankingService for UnconfiguredService {
        async fn rank(&self, _: &str, _: &[RankingRecord]) -> Result<HashMap<String, f64>> {
            panic!("must not be called when unavailable");
        }

        fn name(&self) -> &str {
            "unconfigured"
        }

        fn is_available(&self) -> bool {
            false
        }
    }

    fn item(url: &str, content: &str) -> ScoreItem {
        ScoreItem {
            url: url.into(),
            title: format!("Title of {url}"),
            description: String::new(),
            content: content.into(),
        }
    }

    fn ai_items() -> Vec<ScoreItem> {
        vec![
            item("https://a.test", "Artificial intelligence is a branch of computer science."),
            item("https://b.test", "Artificial flowers look real."),
            item("https://c.test", "Banana bread recipe with walnuts."),
        ]
    }

    #[tokio::test]
    async fn external_scores_are_used_when_available() {
        let scorer = Scorer::new(FixedService::new(vec![0.2, 0.9]), &RankingConfig::default());
        let items = vec![
            item("https://a.test", "alpha"),
            item("https://b.test", "beta"),
            item("https://c.test", ""),
        ];

        let outcome = scorer.score("q", &items).await;
        assert!(outcome.scorer_used());
        assert_eq!(outcome.score_for("https://a.test"), 0.2);
        assert_eq!(outcome.score_for("https://b.test"), 0.9);
        assert_eq!(outcome.score_for("https://c.test"), 0.0);

        // Only content-bearing items are sent, in one call.
        assert_eq!(scorer.service().calls.load(Ordering::SeqCst), 1);
        assert_eq!(scorer.service().seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failure_falls_back_for_whole_batch() {
        let scorer = Scorer::new(FailingService, &RankingConfig::default());
        let outcome = scorer.score("artificial intelligence", &ai_items()).await;

        assert!(!outcome.scorer_used());
        let both = outcome.score_for("https://a.test");
        let one = outcome.score_for("https://b.test");
        let none = outcome.score_for("https://c.test");
        assert!(both > one);
        assert!(one > none);
        assert_eq!(none, 0.0);
    }

    #[tokio::test]
    async fn unavailable_service_is_not_called() {
        let scorer = Scorer::new(UnconfiguredService, &RankingConfig::default());
        let outcome = scorer.score("artificial intelligence", &ai_items()).await;
        assert!(!outcome.scorer_used());
        assert_eq!(outcome.scores().len(), 3);
    }

    #[tokio::test]
    async fn missing_ids_degrade_the_batch() {
        // Only one score for two records.
        let scorer = Scorer::new(FixedService::new(vec![0.7]), &RankingConfig::default());
        let items = vec![
            item("https://a.test", "rust async"),
            item("https://b.test", "rust"),
        ];

        let outcome = scorer.score("rust async", &items).await;
        assert!(!outcome.scorer_used());
        assert_eq!(outcome.score_for("https://a.test"), score_fallback("rust async", "rust async"));
    }

    #[tokio::test]
    async fn out_of_range_scores_are_clamped() {
        let scorer = Scorer::new(FixedService::new(vec![1.8, -0.3]), &RankingConfig::default());
        let items = vec![item("https://a.test", "x"), item("https://b.test", "y")];

        let outcome = scorer.score("q", &items).await;
        assert!(outcome.scorer_used());
        assert_eq!(outcome.score_for("https://a.test"), 1.0);
        assert_eq!(outcome.score_for("https://b.test"), 0.0);
    }

    #[tokio::test]
    async fn slow_service_times_out_into_fallback() {
        let config = RankingConfig {
            timeout_secs: 0.1,
            ..RankingConfig::default()
        };
        let scorer = Scorer::new(SlowService, &config);

        let started = std::time::Instant::now();
        let outcome = scorer.score("artificial intelligence", &ai_items()).await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!outcome.scorer_used());
    }

    #[tokio::test]
    async fn no_content_means_all_zero_and_degraded() {
        let scorer = Scorer::new(FixedService::new(vec![]), &RankingConfig::default());
        let items = vec![item("https://a.test", ""), item("https://b.test", "  ")];

        let outcome = scorer.score("q", &items).await;
        assert!(!outcome.scorer_used());
        assert_eq!(outcome.score_for("https://a.test"), 0.0);
        assert_eq!(outcome.score_for("https://b.test"), 0.0);
        assert_eq!(scorer.service().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn record_composition_is_capped() {
        let it = ScoreItem {
            url: "https://a.test".into(),
            title: "t".repeat(300),
            description: "A short description".into(),
            content: "word ".repeat(5_000),
        };
        let record = RankingRecord::from_item("0", &it, 8_000);

        assert_eq!(record.id, "0");
        assert_eq!(record.title.chars().count(), MAX_TITLE_CHARS);
        assert!(record.content.chars().count() <= 8_000);
        assert!(record.content.contains("Description: A short description\nContent: word"));
    }

    #[test]
    fn record_omits_empty_fields() {
        let it = item("https://a.test", "body text");
        let record = RankingRecord::from_item("3", &ScoreItem { title: String::new(), ..it }, 100);
        assert_eq!(record.content, "Content: body text");
    }

    #[test]
    fn score_item_from_failed_crawl_has_no_content() {
        let crawl = CrawlResult::failed(
            "https://x.test",
            serprank_shared::CrawlStatus::Timeout,
            None,
        );
        let it = ScoreItem::from(&crawl);
        assert!(!it.has_content());
        assert_eq!(it.url, "https://x.test");
    }
}
