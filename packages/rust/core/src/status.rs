//! Availability of the external collaborators.

use serde::Serialize;
use tracing::instrument;

use serprank_ranking::GoogleRankingClient;
use serprank_serp::has_credentials;
use serprank_shared::AppConfig;

/// Which services a search can use right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    /// SERP credentials are present.
    pub dataforseo: bool,
    /// The ranking service answered a probe request.
    pub google_ranking: bool,
    /// Page fetching needs no credentials.
    pub web_crawler: bool,
}

impl ServiceStatus {
    /// A search can run (ranking is optional).
    pub fn can_search(&self) -> bool {
        self.dataforseo && self.web_crawler
    }
}

/// Check SERP credentials and probe the ranking service.
#[instrument(skip_all)]
pub async fn service_status(config: &AppConfig) -> ServiceStatus {
    let google_ranking = match GoogleRankingClient::new(&config.ranking) {
        Ok(client) => client.check_connection().await,
        Err(_) => false,
    };

    ServiceStatus {
        dataforseo: has_credentials(config),
        google_ranking,
        web_crawler: true,
    }
}
