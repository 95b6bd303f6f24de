//! Concurrent, order-preserving page crawler.
//!
//! Every URL gets its own task, gated by a semaphore of `max_concurrency`
//! permits. Each fetch carries an independent timeout and produces exactly
//! one [`CrawlResult`]; a failing URL never affects its siblings. Results are
//! written into index-addressed slots, so the output lines up with the input
//! regardless of completion order.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::{Host, Url};

use serprank_extract::extract_with_limit;
use serprank_shared::{CrawlConfig, CrawlResult, CrawlStatus, Result, SerpRankError};

/// Maximum redirects followed per page.
const MAX_REDIRECTS: usize = 5;

/// Bodies larger than this are not worth extracting (10 MB).
const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Bounded-concurrency fetcher for a fixed list of URLs.
pub struct Crawler {
    config: CrawlConfig,
    client: Client,
}

impl Crawler {
    /// Create a new crawler with the given configuration.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs_f64(config.timeout_secs))
            .build()
            .map_err(|e| SerpRankError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Fetch and extract every URL, returning one result per input in input order.
    ///
    /// Tasks live in a [`JoinSet`], so dropping the returned future aborts
    /// every in-flight and queued fetch.
    #[instrument(skip_all, fields(urls = urls.len(), concurrency = self.config.max_concurrency))]
    pub async fn crawl_all(&self, urls: &[String]) -> Vec<CrawlResult> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let timeout = Duration::from_secs_f64(self.config.timeout_secs);
        let deadline = self
            .config
            .overall_timeout_secs
            .map(|secs| start + Duration::from_secs_f64(secs));

        let mut tasks = JoinSet::new();
        for (idx, url) in urls.iter().enumerate() {
            let client = self.client.clone();
            let sem = semaphore.clone();
            let url = url.clone();
            let max_len = self.config.max_content_length;
            let allow_private = self.config.allow_private_hosts;

            tasks.spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return (idx, CrawlResult::failed(url, CrawlStatus::HttpError, None));
                };

                let result = match tokio::time::timeout(
                    timeout,
                    fetch_page(&client, &url, max_len, allow_private),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        debug!(%url, "fetch timed out");
                        CrawlResult::failed(url, CrawlStatus::Timeout, None)
                    }
                };
                (idx, result)
            });
        }

        let mut slots: Vec<Option<CrawlResult>> = vec![None; urls.len()];
        let mut deadline_hit = false;

        loop {
            let joined = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        deadline_hit = true;
                        warn!(pending = tasks.len(), "crawl deadline reached, abandoning fetches");
                        tasks.abort_all();
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            match joined {
                Some(Ok((idx, result))) => slots[idx] = Some(result),
                Some(Err(e)) => warn!(error = %e, "crawl task failed"),
                None => break,
            }
        }

        // Empty slots are fetches cut off by the deadline, or tasks that panicked.
        let missing_status = if deadline_hit {
            CrawlStatus::Timeout
        } else {
            CrawlStatus::ParseError
        };
        let results: Vec<CrawlResult> = slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| {
                slot.unwrap_or_else(|| CrawlResult::failed(url.as_str(), missing_status, None))
            })
            .collect();

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(
            succeeded,
            failed = results.len() - succeeded,
            duration_ms = start.elapsed().as_millis() as u64,
            "crawl completed"
        );

        results
    }
}

/// Crawl `urls` with a one-off [`Crawler`] built from `config`.
pub async fn crawl_all(urls: &[String], config: CrawlConfig) -> Result<Vec<CrawlResult>> {
    let crawler = Crawler::new(config)?;
    Ok(crawler.crawl_all(urls).await)
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

// ---------------------------------------------------------------------------
// Page fetching
// ---------------------------------------------------------------------------

/// Fetch a single page and extract its content. Never fails: every outcome
/// is encoded in the returned status.
async fn fetch_page(
    client: &Client,
    raw_url: &str,
    max_content_length: usize,
    allow_private: bool,
) -> CrawlResult {
    let url = match Url::parse(raw_url) {
        Ok(url) => url,
        Err(e) => {
            warn!(url = raw_url, error = %e, "invalid URL");
            return CrawlResult::failed(raw_url, CrawlStatus::HttpError, None);
        }
    };

    if !allow_private && is_ssrf_target(&url) {
        warn!(%url, "SSRF protection: blocked");
        return CrawlResult::failed(raw_url, CrawlStatus::HttpError, None);
    }

    debug!(%url, "fetching page");

    let response = match client.get(url.as_str()).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!(%url, error = %e, "request failed");
            return CrawlResult::failed(raw_url, transport_status(&e), None);
        }
    };

    let status = response.status();
    let code = Some(status.as_u16());

    if !status.is_success() {
        debug!(%url, %status, "non-success status");
        return CrawlResult::failed(raw_url, CrawlStatus::HttpError, code);
    }

    if !is_textual(&response) {
        debug!(%url, "non-HTML content type");
        return CrawlResult::failed(raw_url, CrawlStatus::ParseError, code);
    }

    if response.content_length().is_some_and(|len| len > MAX_BODY_BYTES) {
        debug!(%url, "body too large");
        return CrawlResult::failed(raw_url, CrawlStatus::ParseError, code);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!(%url, error = %e, "body read failed");
            let status = if e.is_decode() {
                CrawlStatus::ParseError
            } else {
                transport_status(&e)
            };
            return CrawlResult::failed(raw_url, status, code);
        }
    };

    let page = extract_with_limit(&body, max_content_length);
    if !page.has_content() {
        debug!(%url, "no extractable text");
        return CrawlResult::failed(raw_url, CrawlStatus::ParseError, code);
    }

    CrawlResult {
        url: raw_url.to_string(),
        status: CrawlStatus::Success,
        http_code: code,
        title: page.title,
        meta_description: page.meta_description,
        content: Some(page.content),
        headings: page.headings,
        word_count: page.word_count,
    }
}

fn transport_status(e: &reqwest::Error) -> CrawlStatus {
    if e.is_timeout() {
        CrawlStatus::Timeout
    } else {
        CrawlStatus::HttpError
    }
}

/// Missing content types are given the benefit of the doubt.
fn is_textual(response: &reqwest::Response) -> bool {
    let Some(value) = response.headers().get(reqwest::header::CONTENT_TYPE) else {
        return true;
    };
    let Ok(content_type) = value.to_str() else {
        return false;
    };
    let mime = content_type.to_ascii_lowercase();
    mime.starts_with("text/") || mime.contains("html") || mime.contains("xml")
}
