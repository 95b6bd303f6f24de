//! Google Discovery Engine semantic ranking client (REST).
//!
//! `POST {base}/v1/projects/{project}/locations/{location}/rankingConfigs/{config}:rank`
//! with a bearer token. The project id and token come from the environment
//! variables named in [`RankingConfig`]; without them every call fails fast
//! with a config error and the caller falls back to local scoring.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use serprank_shared::{RankingConfig, Result, SerpRankError};

use crate::{RankingRecord, RankingService};

/// Longest error body echoed into an error message.
const MAX_ERROR_BODY: usize = 300;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RankRequest<'a> {
    model: &'a str,
    query: &'a str,
    top_n: usize,
    records: &'a [RankingRecord],
    ignore_record_details_in_response: bool,
}

#[derive(Debug, Deserialize)]
struct RankResponse {
    #[serde(default)]
    records: Vec<RankedRecord>,
}

#[derive(Debug, Deserialize)]
struct RankedRecord {
    id: String,
    #[serde(default)]
    score: Option<f64>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the hosted semantic ranker.
pub struct GoogleRankingClient {
    client: Client,
    base_url: String,
    location: String,
    ranking_config: String,
    model: String,
    project_id: Option<String>,
    access_token: Option<String>,
}

impl GoogleRankingClient {
    /// Build a client, reading the project id and token from the environment.
    pub fn new(config: &RankingConfig) -> Result<Self> {
        Self::with_credentials(config, config.resolved_project_id(), config.access_token())
    }

    /// Build a client with explicit credentials.
    pub fn with_credentials(
        config: &RankingConfig,
        project_id: Option<String>,
        access_token: Option<String>,
    ) -> Result<Self> {
        if !(config.timeout_secs.is_finite() && config.timeout_secs > 0.0) {
            return Err(SerpRankError::validation(format!(
                "ranking timeout must be positive, got {}",
                config.timeout_secs
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs_f64(config.timeout_secs))
            .build()
            .map_err(|e| SerpRankError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            location: config.location.clone(),
            ranking_config: config.ranking_config.clone(),
            model: config.model.clone(),
            project_id: project_id.filter(|p| !p.is_empty()),
            access_token: access_token.filter(|t| !t.is_empty()),
        })
    }

    /// Whether both a project id and an access token are available.
    pub fn is_configured(&self) -> bool {
        self.project_id.is_some() && self.access_token.is_some()
    }

    /// Probe the service with a one-record rank call.
    pub async fn check_connection(&self) -> bool {
        if !self.is_configured() {
            return false;
        }
        let probe = [RankingRecord {
            id: "probe".into(),
            title: "Connectivity check".into(),
            content: "Content: connectivity check".into(),
        }];
        match self.rank("connectivity check", &probe).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "ranking probe failed");
                false
            }
        }
    }

    fn endpoint(&self, project: &str) -> String {
        format!(
            "{}/v1/projects/{project}/locations/{}/rankingConfigs/{}:rank",
            self.base_url, self.location, self.ranking_config
        )
    }
}

impl RankingService for GoogleRankingClient {
    #[instrument(skip_all, fields(records = records.len()))]
    async fn rank(&self, query: &str, records: &[RankingRecord]) -> Result<HashMap<String, f64>> {
        let project = self
            .project_id
            .as_deref()
            .ok_or_else(|| SerpRankError::config("ranking project id not configured"))?;
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| SerpRankError::config("ranking access token not set"))?;

        let body = RankRequest {
            model: &self.model,
            query,
            top_n: records.len(),
            records,
            ignore_record_details_in_response: true,
        };

        let response = self
            .client
            .post(self.endpoint(project))
            .bearer_auth(token)
            .header("x-goog-user-project", project)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SerpRankError::Timeout(format!("ranking request: {e}"))
                } else {
                    SerpRankError::Ranking(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail: String = detail.chars().take(MAX_ERROR_BODY).collect();
            warn!(%status, "ranking service rejected request");
            return Err(SerpRankError::Ranking(format!("HTTP {status}: {detail}")));
        }

        let parsed: RankResponse = response
            .json()
            .await
            .map_err(|e| SerpRankError::Ranking(format!("malformed response: {e}")))?;

        debug!(returned = parsed.records.len(), "ranking response received");

        Ok(parsed
            .records
            .into_iter()
            .filter_map(|r| r.score.map(|score| (r.id, score)))
            .collect())
    }

    fn name(&self) -> &str {
        "google-discovery-engine"
    }

    fn is_available(&self) -> bool {
        self.is_configured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RANK_PATH: &str =
        "/v1/projects/test-project/locations/global/rankingConfigs/default_ranking_config:rank";

    fn client_for(server: &MockServer) -> GoogleRankingClient {
        let config = RankingConfig {
            base_url: server.uri(),
            timeout_secs: 2.0,
            ..RankingConfig::default()
        };
        GoogleRankingClient::with_credentials(
            &config,
            Some("test-project".into()),
            Some("token-123".into()),
        )
        .unwrap()
    }

    fn records() -> Vec<RankingRecord> {
        vec![
            RankingRecord {
                id: "0".into(),
                title: "AI".into(),
                content: "Content: artificial intelligence".into(),
            },
            RankingRecord {
                id: "1".into(),
                title: "Bread".into(),
                content: "Content: banana bread".into(),
            },
        ]
    }

    #[tokio::test]
    async fn rank_parses_scores() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RANK_PATH))
            .and(header("authorization", "Bearer token-123"))
            .and(body_partial_json(serde_json::json!({
                "model": "semantic-ranker-default@latest",
                "query": "artificial intelligence",
                "topN": 2
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "records": [
                    {"id": "0", "score": 0.91},
                    {"id": "1", "score": 0.02}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let scores = client_for(&server)
            .rank("artificial intelligence", &records())
            .await
            .unwrap();

        assert_eq!(scores.len(), 2);
        assert_eq!(scores["0"], 0.91);
        assert_eq!(scores["1"], 0.02);
    }

    #[tokio::test]
    async fn rank_surfaces_auth_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RANK_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .rank("q", &records())
            .await
            .unwrap_err();
        assert!(matches!(err, SerpRankError::Ranking(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn rank_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RANK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .rank("q", &records())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[tokio::test]
    async fn check_connection_reports_reachability() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RANK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "records": [{"id": "probe", "score": 0.5}]
            })))
            .mount(&server)
            .await;
        assert!(client_for(&server).check_connection().await);

        let down = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&down)
            .await;
        assert!(!client_for(&down).check_connection().await);
    }

    #[tokio::test]
    async fn unconfigured_client_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = RankingConfig {
            base_url: server.uri(),
            ..RankingConfig::default()
        };
        let client = GoogleRankingClient::with_credentials(&config, None, None).unwrap();
        assert!(!client.is_configured());

        let err = client.rank("q", &records()).await.unwrap_err();
        assert!(matches!(err, SerpRankError::Config { .. }));
    }
}
