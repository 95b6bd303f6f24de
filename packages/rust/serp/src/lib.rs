//! Live organic search results.
//!
//! Provides the [`SerpSource`] seam the search pipeline pulls results from,
//! and [`DataForSeoClient`], which implements it against the DataForSEO
//! `serp/google/organic/live/advanced` endpoint.

mod parser;

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, instrument};

use serprank_shared::{AppConfig, Result, SerpEntry, SerpRankError, serp_credentials};

pub use parser::Location;

/// Results requested per query when not configured otherwise.
pub const DEFAULT_DEPTH: u32 = 20;

/// Maximum response size accepted from the API (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

const USER_AGENT: &str = concat!("serprank/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Source seam
// ---------------------------------------------------------------------------

/// A provider of ranked organic results for a query.
pub trait SerpSource: Send + Sync {
    /// Fetch organic results in original search order.
    fn fetch(
        &self,
        query: &str,
        location: &str,
        language: &str,
    ) -> impl Future<Output = Result<Vec<SerpEntry>>> + Send;
}

// ---------------------------------------------------------------------------
// DataForSEO client
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct LiveTask<'a> {
    keyword: &'a str,
    location_name: &'a str,
    language_code: &'a str,
    device: &'a str,
    os: &'a str,
    depth: u32,
}

/// DataForSEO live SERP client using HTTP basic auth.
pub struct DataForSeoClient {
    client: Client,
    base_url: String,
    login: String,
    password: String,
    depth: u32,
}

impl DataForSeoClient {
    /// Build a client from explicit credentials.
    pub fn new(
        base_url: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
        timeout_secs: f64,
    ) -> Result<Self> {
        let timeout = Duration::try_from_secs_f64(timeout_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                SerpRankError::validation(format!("SERP timeout must be positive, got {timeout_secs}"))
            })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SerpRankError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            login: login.into(),
            password: password.into(),
            depth: DEFAULT_DEPTH,
        })
    }

    /// Build a client from the app config, reading credentials from the
    /// environment variables it names.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let (login, password) = serp_credentials(config)?;
        Ok(Self::new(
            config.dataforseo.base_url.clone(),
            login,
            password,
            config.dataforseo.timeout_secs,
        )?
        .with_depth(config.defaults.serp_depth))
    }

    /// Number of results requested per query (at least 1).
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth.max(1);
        self
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// List the locations the API accepts.
    #[instrument(skip(self))]
    pub async fn locations(&self) -> Result<Vec<Location>> {
        let url = format!("{}/serp/google/locations", self.base_url);
        let body = self.send(self.client.get(&url)).await?;
        let locations = parser::parse_locations(&body)?;
        debug!(count = locations.len(), "locations fetched");
        Ok(locations)
    }

    /// Numeric code for a location name (case-insensitive exact match).
    pub async fn location_code(&self, location_name: &str) -> Result<Option<u32>> {
        let locations = self.locations().await?;
        Ok(locations
            .into_iter()
            .find(|l| l.location_name.eq_ignore_ascii_case(location_name))
            .map(|l| l.location_code))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request
            .basic_auth(&self.login, Some(&self.password))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SerpRankError::Timeout(format!("SERP request: {e}"))
                } else {
                    SerpRankError::Serp(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SerpRankError::Serp(format!("HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(SerpRankError::Serp(format!(
                    "response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        response
            .text()
            .await
            .map_err(|e| SerpRankError::Serp(format!("failed to read body: {e}")))
    }
}

impl SerpSource for DataForSeoClient {
    #[instrument(skip(self), fields(depth = self.depth))]
    async fn fetch(&self, query: &str, location: &str, language: &str) -> Result<Vec<SerpEntry>> {
        let url = format!("{}/serp/google/organic/live/advanced", self.base_url);
        let payload = [LiveTask {
            keyword: query,
            location_name: location,
            language_code: language,
            device: "desktop",
            os: "windows",
            depth: self.depth,
        }];

        let body = self.send(self.client.post(&url).json(&payload)).await?;
        let entries = parser::parse_organic(&body, self.depth as usize)?;

        info!(results = entries.len(), "SERP results fetched");
        Ok(entries)
    }
}

/// Whether SERP credentials are present in the environment.
pub fn has_credentials(config: &AppConfig) -> bool {
    serp_credentials(config).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fixture() -> String {
        std::fs::read_to_string("../../../fixtures/serp/organic-live.json")
            .expect("read SERP fixture")
    }

    fn client_for(server: &MockServer) -> DataForSeoClient {
        DataForSeoClient::new(server.uri(), "user@test", "secret", 5.0).unwrap()
    }

    #[tokio::test]
    async fn fetch_posts_task_and_parses_organic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/serp/google/organic/live/advanced"))
            .and(basic_auth("user@test", "secret"))
            .and(body_partial_json(serde_json::json!([{
                "keyword": "artificial intelligence",
                "location_name": "United States",
                "language_code": "en",
                "device": "desktop",
                "depth": 20
            }])))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture()))
            .expect(1)
            .mount(&server)
            .await;

        let entries = client_for(&server)
            .fetch("artificial intelligence", "United States", "en")
            .await
            .unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].domain, "en.wikipedia.org");
    }

    #[tokio::test]
    async fn http_error_is_serp_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch("q", "United States", "en")
            .await
            .unwrap_err();
        assert!(matches!(err, SerpRankError::Serp(_)));
    }

    #[tokio::test]
    async fn api_level_error_is_serp_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status_code": 40200,
                "status_message": "Payment Required.",
                "tasks": []
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch("q", "United States", "en")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Payment Required"));
    }

    #[tokio::test]
    async fn depth_is_sent_and_applied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!([{ "depth": 2 }])))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture()))
            .expect(1)
            .mount(&server)
            .await;

        let entries = client_for(&server)
            .with_depth(2)
            .fetch("artificial intelligence", "United States", "en")
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn location_code_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/serp/google/locations"))
            .and(basic_auth("user@test", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status_code": 20000,
                "tasks": [{"status_code": 20000, "result": [
                    {"location_code": 2840, "location_name": "United States"},
                    {"location_code": 2276, "location_name": "Germany"}
                ]}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.location_code("germany").await.unwrap(), Some(2276));
        assert_eq!(client.location_code("Atlantis").await.unwrap(), None);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(DataForSeoClient::new("http://localhost", "a", "b", 0.0).is_err());
    }

    #[test]
    fn depth_is_at_least_one() {
        let client = DataForSeoClient::new("http://localhost", "a", "b", 1.0)
            .unwrap()
            .with_depth(0);
        assert_eq!(client.depth(), 1);
    }
}
