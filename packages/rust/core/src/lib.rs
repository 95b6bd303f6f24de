//! Search orchestration for serprank.
//!
//! This crate ties together the SERP source, the page crawler, and relevance
//! scoring into one search request (`SearchEngine::search`), and exposes the
//! response shape callers consume.

pub mod pipeline;
pub mod response;
pub mod search;
pub mod status;

pub use pipeline::{ProgressReporter, SilentProgress, run};
pub use response::{ResponseMetadata, ResultItem, SearchDigest, SearchResponse, digest};
pub use search::{SearchEngine, SearchRequest};
pub use status::{ServiceStatus, service_status};
