//! serprank CLI: live search results re-ranked by page content relevance.
//!
//! Fetches organic results for a query, crawls every result page, and orders
//! them by a semantic relevance score (or a lexical fallback).

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
