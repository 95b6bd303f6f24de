//! Crawl-and-rank pipeline: SERP entries → crawl → score → merge → sort.

use std::cmp::Ordering;
use std::time::Instant;

use tracing::{info, instrument};

use serprank_crawler::Crawler;
use serprank_ranking::{RankingOutcome, RankingService, ScoreItem, Scorer};
use serprank_shared::{CrawlResult, RankedResult, SearchSummary, SerpEntry};

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the crawl stage finishes.
    fn crawled(&self, successful: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, summary: &SearchSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn crawled(&self, _successful: usize, _total: usize) {}
    fn done(&self, _summary: &SearchSummary) {}
}

/// Run the pipeline over pre-fetched SERP entries.
///
/// 1. Crawl every entry URL (bounded concurrency, per-URL isolation)
/// 2. Score the successful crawls in one batch
/// 3. Merge SERP data, crawl outcome and score
/// 4. Sort by score descending, ties by original position, and assign ranks
///
/// Always returns exactly one [`RankedResult`] per entry.
#[instrument(skip_all, fields(query = %query, entries = serp_entries.len()))]
pub async fn run<R: RankingService>(
    query: &str,
    serp_entries: Vec<SerpEntry>,
    crawler: &Crawler,
    scorer: &Scorer<R>,
    progress: &dyn ProgressReporter,
) -> (Vec<RankedResult>, SearchSummary) {
    let start = Instant::now();
    let serp_count = serp_entries.len();

    // --- Crawl ---
    progress.phase("Crawling result pages");
    let crawl_start = Instant::now();
    let urls: Vec<String> = serp_entries.iter().map(|e| e.url.clone()).collect();
    let crawls = crawler.crawl_all(&urls).await;
    let crawl_time = crawl_start.elapsed();

    let successful_crawls = crawls.iter().filter(|c| c.is_success()).count();
    progress.crawled(successful_crawls, serp_count);
    info!(
        successful_crawls,
        total = serp_count,
        elapsed_ms = crawl_time.as_millis() as u64,
        "crawl stage complete"
    );

    // --- Score ---
    progress.phase("Ranking content");
    let ranking_start = Instant::now();
    let items: Vec<ScoreItem> = crawls
        .iter()
        .filter(|c| c.is_success())
        .map(ScoreItem::from)
        .collect();
    let outcome = scorer.score(query, &items).await;
    let ranking_time = ranking_start.elapsed();

    // --- Merge and sort ---
    let scorer_used = outcome.scorer_used();
    let mut results = merge(serp_entries, crawls, &outcome);
    sort_and_rank(&mut results);

    let summary = SearchSummary {
        query: query.to_string(),
        total_time_seconds: start.elapsed().as_secs_f64(),
        crawl_time_seconds: crawl_time.as_secs_f64(),
        ranking_time_seconds: ranking_time.as_secs_f64(),
        serp_count,
        successful_crawls,
        scorer_used,
    };

    info!(
        results = results.len(),
        successful_crawls,
        scorer_used,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "pipeline complete"
    );
    progress.done(&summary);

    (results, summary)
}

/// Join each entry with its crawl (same index) and score.
fn merge(
    serp_entries: Vec<SerpEntry>,
    crawls: Vec<CrawlResult>,
    outcome: &RankingOutcome,
) -> Vec<RankedResult> {
    serp_entries
        .into_iter()
        .zip(crawls)
        .map(|(serp, crawl)| {
            let score = if crawl.is_success() {
                outcome.score_for(&crawl.url)
            } else {
                0.0
            };
            RankedResult {
                original_position: serp.position,
                serp,
                crawl,
                score,
                rank: 0,
            }
        })
        .collect()
}

/// Stable sort by score descending then position ascending; ranks 1..N.
pub(crate) fn sort_and_rank(results: &mut [RankedResult]) {
    results.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.original_position.cmp(&b.original_position),
        other => other,
    });
    for (i, result) in results.iter_mut().enumerate() {
        result.rank = i + 1;
    }
}
