//! Concurrent page crawler for SERP result URLs.
//!
//! This crate provides:
//! - [`Crawler`]: bounded-concurrency, per-URL isolated fetcher
//! - [`crawl_all`]: one-shot helper building a crawler from a [`CrawlConfig`]
//!
//! Extraction of the fetched markup is delegated to `serprank-extract`.
//!
//! [`CrawlConfig`]: serprank_shared::CrawlConfig

pub mod engine;

pub use engine::{Crawler, crawl_all};
