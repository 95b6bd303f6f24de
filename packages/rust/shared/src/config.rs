//! Application configuration for serprank.
//!
//! User config lives at `~/.serprank/serprank.toml`.
//! CLI flags override config file values, which override defaults.
//! Credentials are never stored in the file: each section names the
//! environment variable that holds them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SerpRankError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "serprank.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".serprank";

/// Browser-like User-Agent; many sites refuse obvious bot agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching serprank.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Search defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Page crawler settings.
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// DataForSEO SERP API settings.
    #[serde(default)]
    pub dataforseo: DataForSeoConfig,

    /// External ranking service settings.
    #[serde(default)]
    pub ranking: RankingConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// SERP location name (e.g. "United States").
    #[serde(default = "default_location")]
    pub location: String,

    /// SERP language code.
    #[serde(default = "default_language")]
    pub language: String,

    /// Number of SERP results to request.
    #[serde(default = "default_serp_depth")]
    pub serp_depth: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            language: default_language(),
            serp_depth: default_serp_depth(),
        }
    }
}

fn default_location() -> String {
    "United States".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_serp_depth() -> u32 {
    20
}

/// `[crawler]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum concurrent page fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-URL fetch timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Maximum characters of extracted text kept per page.
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,

    /// User-Agent sent with page fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            max_content_length: default_max_content_length(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_concurrency() -> usize {
    5
}
fn default_timeout_secs() -> f64 {
    30.0
}
fn default_max_content_length() -> usize {
    5000
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

/// `[dataforseo]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataForSeoConfig {
    /// API base URL.
    #[serde(default = "default_dataforseo_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API login.
    #[serde(default = "default_login_env")]
    pub login_env: String,

    /// Name of the env var holding the API password.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

impl Default for DataForSeoConfig {
    fn default() -> Self {
        Self {
            base_url: default_dataforseo_base_url(),
            login_env: default_login_env(),
            password_env: default_password_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_dataforseo_base_url() -> String {
    "https://api.dataforseo.com/v3".into()
}
fn default_login_env() -> String {
    "DATAFORSEO_LOGIN".into()
}
fn default_password_env() -> String {
    "DATAFORSEO_PASSWORD".into()
}

/// `[ranking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Ranking API base URL.
    #[serde(default = "default_ranking_base_url")]
    pub base_url: String,

    /// Cloud project id. Falls back to the `project_id_env` variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Name of the env var holding the project id.
    #[serde(default = "default_project_id_env")]
    pub project_id_env: String,

    /// Ranking location.
    #[serde(default = "default_ranking_location")]
    pub location: String,

    /// Ranking config resource name.
    #[serde(default = "default_ranking_config_name")]
    pub ranking_config: String,

    /// Semantic ranker model.
    #[serde(default = "default_ranking_model")]
    pub model: String,

    /// Name of the env var holding the OAuth access token.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Maximum characters of composed record content sent per document.
    #[serde(default = "default_max_record_chars")]
    pub max_record_chars: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            base_url: default_ranking_base_url(),
            project_id: None,
            project_id_env: default_project_id_env(),
            location: default_ranking_location(),
            ranking_config: default_ranking_config_name(),
            model: default_ranking_model(),
            access_token_env: default_access_token_env(),
            timeout_secs: default_timeout_secs(),
            max_record_chars: default_max_record_chars(),
        }
    }
}

impl RankingConfig {
    /// The configured project id, from the file or the environment.
    pub fn resolved_project_id(&self) -> Option<String> {
        self.project_id
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| env_value(&self.project_id_env))
    }

    /// The access token from the environment, if set.
    pub fn access_token(&self) -> Option<String> {
        env_value(&self.access_token_env)
    }
}

fn default_ranking_base_url() -> String {
    "https://discoveryengine.googleapis.com".into()
}
fn default_project_id_env() -> String {
    "GOOGLE_CLOUD_PROJECT_ID".into()
}
fn default_ranking_location() -> String {
    "global".into()
}
fn default_ranking_config_name() -> String {
    "default_ranking_config".into()
}
fn default_ranking_model() -> String {
    "semantic-ranker-default@latest".into()
}
fn default_access_token_env() -> String {
    "GOOGLE_ACCESS_TOKEN".into()
}
fn default_max_record_chars() -> usize {
    8000
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum concurrent HTTP requests.
    pub max_concurrency: usize,
    /// Per-URL timeout in seconds.
    pub timeout_secs: f64,
    /// Maximum characters of extracted text kept per page.
    pub max_content_length: usize,
    /// User-Agent header for page fetches.
    pub user_agent: String,
    /// Deadline for the whole crawl stage; unfinished fetches become timeouts.
    pub overall_timeout_secs: Option<f64>,
    /// Allow fetching loopback/private addresses (mock servers in tests).
    pub allow_private_hosts: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_concurrency: config.crawler.concurrency,
            timeout_secs: config.crawler.timeout_secs,
            max_content_length: config.crawler.max_content_length,
            user_agent: config.crawler.user_agent.clone(),
            overall_timeout_secs: None,
            allow_private_hosts: false,
        }
    }
}

impl CrawlConfig {
    /// Reject settings the crawler cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(SerpRankError::validation("crawl concurrency must be at least 1"));
        }
        if self.max_content_length == 0 {
            return Err(SerpRankError::validation(
                "max content length must be at least 1 character",
            ));
        }
        if !(self.timeout_secs.is_finite() && self.timeout_secs > 0.0) {
            return Err(SerpRankError::validation(format!(
                "crawl timeout must be a positive number of seconds, got {}",
                self.timeout_secs
            )));
        }
        if let Some(overall) = self.overall_timeout_secs {
            if !(overall.is_finite() && overall > 0.0) {
                return Err(SerpRankError::validation(format!(
                    "overall crawl timeout must be positive, got {overall}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.serprank/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SerpRankError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.serprank/serprank.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SerpRankError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SerpRankError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SerpRankError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SerpRankError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SerpRankError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the DataForSEO login/password from their env vars.
pub fn serp_credentials(config: &AppConfig) -> Result<(String, String)> {
    let login_var = &config.dataforseo.login_env;
    let password_var = &config.dataforseo.password_env;
    match (env_value(login_var), env_value(password_var)) {
        (Some(login), Some(password)) => Ok((login, password)),
        _ => Err(SerpRankError::config(format!(
            "DataForSEO credentials not found. Set the {login_var} and {password_var} \
             environment variables."
        ))),
    }
}

/// Value of an environment variable, treating empty as unset.
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("DATAFORSEO_LOGIN"));
        assert!(toml_str.contains("semantic-ranker-default@latest"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.crawler.concurrency, 5);
        assert_eq!(parsed.defaults.serp_depth, 20);
        assert_eq!(parsed.ranking.location, "global");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[crawler]
concurrency = 2

[ranking]
project_id = "my-project"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.crawler.concurrency, 2);
        assert_eq!(config.crawler.max_content_length, 5000);
        assert_eq!(config.defaults.location, "United States");
        assert_eq!(
            config.ranking.resolved_project_id().as_deref(),
            Some("my-project")
        );
    }

    #[test]
    fn crawl_config_from_app_config() {
        let app = AppConfig::default();
        let crawl = CrawlConfig::from(&app);
        assert_eq!(crawl.max_concurrency, 5);
        assert_eq!(crawl.timeout_secs, 30.0);
        assert_eq!(crawl.max_content_length, 5000);
        assert!(!crawl.allow_private_hosts);
        assert!(crawl.validate().is_ok());
    }

    #[test]
    fn crawl_config_rejects_zero_concurrency() {
        let crawl = CrawlConfig {
            max_concurrency: 0,
            ..CrawlConfig::default()
        };
        assert!(crawl.validate().is_err());

        let crawl = CrawlConfig {
            timeout_secs: 0.0,
            ..CrawlConfig::default()
        };
        assert!(crawl.validate().is_err());
    }

    #[test]
    fn crawl_config_rejects_zero_content_length() {
        let crawl = CrawlConfig {
            max_content_length: 0,
            ..CrawlConfig::default()
        };
        let err = crawl.validate().unwrap_err();
        assert!(err.to_string().contains("max content length"));

        let crawl = CrawlConfig {
            max_content_length: 1,
            ..CrawlConfig::default()
        };
        assert!(crawl.validate().is_ok());
    }

    #[test]
    fn missing_serp_credentials() {
        let mut config = AppConfig::default();
        // Unique env var names to avoid interfering with other tests
        config.dataforseo.login_env = "SR_TEST_NONEXISTENT_LOGIN_12345".into();
        config.dataforseo.password_env = "SR_TEST_NONEXISTENT_PASSWORD_12345".into();
        let result = serp_credentials(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("credentials not found"));
    }
}
