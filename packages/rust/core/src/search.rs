//! End-to-end search: SERP fetch → crawl-and-rank pipeline → response.

use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument};

use serprank_crawler::Crawler;
use serprank_ranking::{GoogleRankingClient, RankingService, Scorer};
use serprank_serp::{DataForSeoClient, SerpSource};
use serprank_shared::{AppConfig, CrawlConfig, Result, SearchId, SerpRankError};

use crate::pipeline::{self, ProgressReporter};
use crate::response::{ResponseMetadata, ResultItem, SearchResponse};

/// One search request.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub location: String,
    pub language: String,
}

impl SearchRequest {
    /// A request using the configured default location and language.
    pub fn new(query: impl Into<String>, config: &AppConfig) -> Self {
        Self {
            query: query.into(),
            location: config.defaults.location.clone(),
            language: config.defaults.language.clone(),
        }
    }
}

/// Wires a SERP source, a crawler, and a scorer into one search operation.
pub struct SearchEngine<S, R> {
    serp: S,
    crawler: Crawler,
    scorer: Scorer<R>,
}

impl SearchEngine<DataForSeoClient, GoogleRankingClient> {
    /// Build the production engine from config.
    ///
    /// Fails when SERP credentials are missing. Missing ranking credentials
    /// are not an error; results are then scored locally.
    pub fn from_config(config: &AppConfig, crawl: CrawlConfig) -> Result<Self> {
        let serp = DataForSeoClient::from_config(config)?;
        let crawler = Crawler::new(crawl)?;
        let ranker = GoogleRankingClient::new(&config.ranking)?;
        Ok(Self::new(serp, crawler, Scorer::new(ranker, &config.ranking)))
    }
}

impl<S: SerpSource, R: RankingService> SearchEngine<S, R> {
    pub fn new(serp: S, crawler: Crawler, scorer: Scorer<R>) -> Self {
        Self {
            serp,
            crawler,
            scorer,
        }
    }

    /// Run a search.
    ///
    /// A SERP failure or an empty SERP result is an error; everything after
    /// that degrades into per-result statuses and the ranking flag.
    #[instrument(skip_all, fields(query = %request.query, location = %request.location))]
    pub async fn search(
        &self,
        request: &SearchRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<SearchResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(SerpRankError::validation("query must not be empty"));
        }

        let start = Instant::now();
        let search_id = SearchId::new();
        let searched_at = Utc::now();

        progress.phase("Fetching search results");
        let entries = self
            .serp
            .fetch(query, &request.location, &request.language)
            .await?;
        if entries.is_empty() {
            return Err(SerpRankError::Serp(format!("no organic results for '{query}'")));
        }
        info!(%search_id, results = entries.len(), "SERP results received");

        let (ranked, summary) =
            pipeline::run(query, entries, &self.crawler, &self.scorer, progress).await;

        Ok(SearchResponse {
            search_id,
            searched_at,
            query: query.to_string(),
            location: request.location.clone(),
            language: request.language.clone(),
            results: ranked.into_iter().map(ResultItem::from).collect(),
            metadata: ResponseMetadata::from_summary(&summary, start.elapsed().as_secs_f64()),
        })
    }
}
