//! Shared types, error model, and configuration for serprank.
//!
//! This crate is the foundation depended on by all other serprank crates.
//! It provides:
//! - [`SerpRankError`]: the unified error type
//! - Domain types ([`SerpEntry`], [`CrawlResult`], [`RankedResult`], [`SearchSummary`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlerConfig, DEFAULT_USER_AGENT, DataForSeoConfig, DefaultsConfig,
    RankingConfig, config_dir, config_file_path, env_value, init_config, load_config,
    load_config_from, serp_credentials,
};
pub use error::{Result, SerpRankError};
pub use types::{CrawlResult, CrawlStatus, RankedResult, SearchId, SearchSummary, SerpEntry};
