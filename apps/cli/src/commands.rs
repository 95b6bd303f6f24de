//! CLI command definitions, routing, and tracing setup.

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serprank_core::{
    ProgressReporter, SearchEngine, SearchRequest, SearchResponse, digest, service_status,
};
use serprank_serp::DataForSeoClient;
use serprank_shared::{AppConfig, CrawlConfig, SearchSummary, init_config, load_config};
use tracing::info;

/// Content preview length in text output.
const PREVIEW_CHARS: usize = 160;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// serprank: live search results, crawled and re-ranked by relevance.
#[derive(Parser)]
#[command(
    name = "serprank",
    version,
    about = "Fetch live search results, crawl each page, and re-rank them by semantic relevance.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Search, crawl, and rank results for a query.
    Search {
        #[command(flatten)]
        args: SearchArgs,

        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search and print only the results digest.
    Summary {
        #[command(flatten)]
        args: SearchArgs,

        /// Print the digest as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Report which external services are usable.
    Status,

    /// Look up the SERP location code for a location name.
    Locations {
        /// Location name, e.g. "United Kingdom".
        name: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options shared by commands that run a search.
#[derive(Args)]
pub(crate) struct SearchArgs {
    /// Search query.
    pub query: String,

    /// Search location (defaults to config).
    #[arg(short, long)]
    pub location: Option<String>,

    /// Search language code (defaults to config).
    #[arg(long)]
    pub language: Option<String>,

    /// Maximum concurrent page fetches.
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Per-page fetch timeout in seconds.
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Deadline for the whole crawl stage in seconds.
    #[arg(long)]
    pub deadline: Option<f64>,

    /// Maximum characters of extracted text kept per page.
    #[arg(long)]
    pub max_content: Option<usize>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "serprank=info",
        1 => "serprank=debug",
        _ => "serprank=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Search { args, json } => cmd_search(&args, json).await,
        Command::Summary { args, json } => cmd_summary(&args, json).await,
        Command::Status => cmd_status().await,
        Command::Locations { name } => cmd_locations(&name).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// Merge config file values with CLI overrides and run one search.
async fn execute_search(args: &SearchArgs, show_progress: bool) -> Result<SearchResponse> {
    let config = load_config()?;

    let mut crawl = CrawlConfig::from(&config);
    if let Some(c) = args.concurrency {
        crawl.max_concurrency = c;
    }
    if let Some(t) = args.timeout {
        crawl.timeout_secs = t;
    }
    if let Some(m) = args.max_content {
        crawl.max_content_length = m;
    }
    crawl.overall_timeout_secs = args.deadline;

    let mut request = SearchRequest::new(args.query.clone(), &config);
    if let Some(location) = &args.location {
        request.location = location.clone();
    }
    if let Some(language) = &args.language {
        request.language = language.clone();
    }

    info!(
        query = %request.query,
        location = %request.location,
        language = %request.language,
        concurrency = crawl.max_concurrency,
        "starting search"
    );

    let engine = SearchEngine::from_config(&config, crawl)?;

    let response = if show_progress {
        let reporter = CliProgress::new();
        engine.search(&request, &reporter).await
    } else {
        engine.search(&request, &serprank_core::SilentProgress).await
    }?;

    Ok(response)
}

async fn cmd_search(args: &SearchArgs, json: bool) -> Result<()> {
    let response = execute_search(args, !json).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let meta = &response.metadata;
    println!();
    println!("  Query:    {}", response.query);
    println!("  Location: {} ({})", response.location, response.language);
    println!(
        "  Crawled:  {}/{} pages in {:.2}s",
        meta.successful_crawls, meta.serp_count, meta.crawl_time_seconds
    );
    println!(
        "  Ranking:  {}",
        if meta.google_ranking_api_used {
            "semantic ranker"
        } else {
            "lexical fallback"
        }
    );
    println!("  Time:     {:.2}s", meta.total_time_seconds);
    println!();

    for r in &response.results {
        let title = if r.title.is_empty() { &r.serp_title } else { &r.title };
        println!(
            "  {:>2}. [{:.4}] {}  (serp #{}, {})",
            r.rank, r.ranking_score, title, r.serp_position, r.crawl_status
        );
        println!("      {}", r.url);
        if !r.content.is_empty() {
            let preview: String = r.content.chars().take(PREVIEW_CHARS).collect();
            println!("      {preview}");
        }
    }
    println!();

    Ok(())
}

async fn cmd_summary(args: &SearchArgs, json: bool) -> Result<()> {
    let response = execute_search(args, !json).await?;
    let d = digest(&response);

    if json {
        println!("{}", serde_json::to_string_pretty(&d)?);
        return Ok(());
    }

    println!();
    println!("  Query:            {}", d.query);
    println!("  Results:          {}", d.total_results);
    println!("  Ranked:           {}", d.successfully_ranked);
    println!(
        "  Top result:       {} ({:.4})",
        d.top_ranked_url.as_deref().unwrap_or("-"),
        d.top_ranking_score
    );
    println!("  Average score:    {:.3}", d.average_ranking_score);
    println!("  Domains:          {}", d.domains_found);
    println!("  Total words:      {}", d.total_word_count);
    println!("  Processing time:  {:.2}s", d.processing_time);
    println!();

    Ok(())
}

async fn cmd_status() -> Result<()> {
    let config = load_config()?;
    let status = service_status(&config).await;

    let mark = |ok: bool| if ok { "ok" } else { "unavailable" };
    println!("  DataForSEO SERP:   {}", mark(status.dataforseo));
    println!("  Semantic ranking:  {}", mark(status.google_ranking));
    println!("  Web crawler:       {}", mark(status.web_crawler));

    if !status.can_search() {
        return Err(eyre!(
            "searching requires SERP credentials; set {} and {}",
            config.dataforseo.login_env,
            config.dataforseo.password_env
        ));
    }
    Ok(())
}

async fn cmd_locations(name: &str) -> Result<()> {
    let config = load_config()?;
    let client = DataForSeoClient::from_config(&config)?;

    match client.location_code(name).await? {
        Some(code) => println!("{name}: {code}"),
        None => return Err(eyre!("no location named '{name}'")),
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn crawled(&self, successful: usize, total: usize) {
        self.spinner
            .set_message(format!("Crawled {successful}/{total} pages"));
    }

    fn done(&self, _summary: &SearchSummary) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}
