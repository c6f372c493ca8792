mod dry_run;
mod export;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hnjobs_client::llm::{
    DEFAULT_BASE_URL, DEFAULT_LLM_TIMEOUT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
use hnjobs_client::{ExtractionStrategy, OpenAiExtractor, ReqwestFetcher};
use hnjobs_core::crawl::{
    CrawlConfig, CrawlService, CrawlSummary, DEFAULT_BATCH_SIZE, DEFAULT_HISTORICAL_LIMIT,
    TracingCrawlReporter,
};
use hnjobs_core::locator::{DEFAULT_BACKWARD_SCAN_LIMIT, ThreadLocator};
use hnjobs_core::traits::{FieldExtractor, Fetcher, JobStore};
use hnjobs_core::{
    HN_API_BASE, HnClient, RateLimitConfig, RateLimitedFetcher, RetryPolicy, RetryingFetcher,
};
use hnjobs_db::{Database, DatabaseConfig, JobRepository};

use crate::dry_run::PrintStore;

#[derive(Parser)]
#[command(name = "hnjobs", version, about = "Hacker News job board crawler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    fetch: FetchArgs,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl top-level comments of a "Who is hiring?" thread
    Crawl {
        /// Thread item id (defaults to this month's thread)
        #[arg(short, long)]
        thread_id: Option<u64>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Crawl job stories plus a bounded scan of older items
    Jobs {
        /// Upper bound on ids scanned backward from the newest item
        #[arg(long, default_value_t = DEFAULT_HISTORICAL_LIMIT)]
        historical_limit: u64,

        /// Ids scanned per run (capped by --historical-limit)
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: u64,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the id of this month's "Who is hiring?" thread
    FindThread {
        /// Ids scanned backward from the newest item if the thread is not listed
        #[arg(long, default_value_t = DEFAULT_BACKWARD_SCAN_LIMIT)]
        scan_limit: u64,
    },

    /// Write all stored jobs to CSV
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct FetchArgs {
    /// Hacker News API base URL
    #[arg(long, env = "HNJOBS_API_BASE", default_value = HN_API_BASE, global = true)]
    api_base: String,

    /// Minimum delay between API requests, in milliseconds
    #[arg(long, default_value_t = 500, global = true)]
    request_delay_ms: u64,

    /// Maximum API requests per rolling minute
    #[arg(
        long,
        default_value_t = 30,
        value_parser = clap::value_parser!(u32).range(1..),
        global = true
    )]
    max_requests_per_minute: u32,

    /// Retries for transient API failures
    #[arg(long, default_value_t = 3, global = true)]
    max_retries: u32,
}

#[derive(Args)]
struct RunArgs {
    /// Stop after this many posts with extracted content
    #[arg(short = 'n', long)]
    limit: Option<usize>,

    /// Write a CSV snapshot of the table when the crawl completes
    #[arg(long, conflicts_with = "dry_run")]
    export: Option<PathBuf>,

    /// Print records as JSON lines instead of writing to the database
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args)]
struct LlmArgs {
    /// OpenAI API key; enables LLM extraction instead of the heuristic parser
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// LLM model
    #[arg(long, env = "HNJOBS_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "HNJOBS_LLM_BASE_URL", default_value = DEFAULT_BASE_URL)]
    llm_base_url: String,

    /// File holding the extraction prompt; must contain {job_text}
    #[arg(long, env = "HNJOBS_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Completion token cap per post
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// LLM request timeout, in seconds
    #[arg(long, default_value_t = DEFAULT_LLM_TIMEOUT.as_secs())]
    llm_timeout_secs: u64,
}

enum Target {
    Thread(u64),
    CurrentThread,
    JobStories,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("hnjobs={level}").parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Crawl { thread_id, run } => {
            let target = match thread_id {
                Some(id) => Target::Thread(id),
                None => Target::CurrentThread,
            };
            let config = CrawlConfig::default().with_limit(run.limit);
            cmd_crawl(target, config, &cli.fetch, run).await?;
        }
        Commands::Jobs {
            historical_limit,
            batch_size,
            run,
        } => {
            let config = CrawlConfig::default()
                .with_limit(run.limit)
                .with_historical_limit(historical_limit)
                .with_batch_size(batch_size);
            cmd_crawl(Target::JobStories, config, &cli.fetch, run).await?;
        }
        Commands::FindThread { scan_limit } => {
            let locator = build_locator(&cli.fetch)?.with_backward_scan_limit(scan_limit);
            let thread = locator.find(chrono::Utc::now()).await?;
            println!("{}\t{}", thread.id, thread.title.unwrap_or_default());
        }
        Commands::Export { output } => {
            let repo = connect_db().await?;
            let postings = repo.list_for_export().await?;
            match output {
                Some(path) => {
                    export::export_to_path(&postings, &path)?;
                }
                None => {
                    export::write_csv(&postings, std::io::stdout().lock())?;
                }
            }
        }
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL (or POSTGRES_URL) and migrate.
async fn connect_db() -> Result<JobRepository> {
    let config = DatabaseConfig::from_env()?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;

    let repo = db.job_repo();
    repo.health_check().await?;
    Ok(repo)
}

fn build_fetcher(args: &FetchArgs) -> Result<RateLimitedFetcher<RetryingFetcher<ReqwestFetcher>>> {
    let http = ReqwestFetcher::new().context("Failed to create HTTP client")?;
    let retrying = RetryingFetcher::new(
        http,
        RetryPolicy::default().with_max_retries(args.max_retries),
    );
    let limits = RateLimitConfig::default()
        .with_min_delay(Duration::from_millis(args.request_delay_ms))
        .with_max_requests(args.max_requests_per_minute);

    Ok(RateLimitedFetcher::new(retrying, limits))
}

/// The thread search paces itself and stays outside the per-minute budget.
fn build_locator(args: &FetchArgs) -> Result<ThreadLocator<RetryingFetcher<ReqwestFetcher>>> {
    let http = ReqwestFetcher::new().context("Failed to create HTTP client")?;
    let retrying = RetryingFetcher::new(
        http,
        RetryPolicy::default().with_max_retries(args.max_retries),
    );
    let client = HnClient::with_base_url(retrying, &args.api_base)?;
    Ok(ThreadLocator::new(client))
}

fn build_extractor(args: &LlmArgs) -> Result<ExtractionStrategy> {
    let Some(api_key) = args.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        return Ok(ExtractionStrategy::select(None));
    };

    let extractor = OpenAiExtractor::with_base_url(api_key, &args.model, &args.llm_base_url)?
        .with_timeout(Duration::from_secs(args.llm_timeout_secs))?
        .with_max_tokens(args.max_tokens);
    let extractor = match &args.prompt_file {
        Some(path) => {
            let template = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
            extractor.with_prompt(template)?
        }
        None => extractor,
    };
    tracing::debug!(
        model = extractor.model(),
        max_tokens = args.max_tokens,
        "LLM extraction enabled"
    );
    Ok(ExtractionStrategy::select(Some(extractor)))
}

async fn cmd_crawl(
    target: Target,
    config: CrawlConfig,
    fetch: &FetchArgs,
    run: RunArgs,
) -> Result<()> {
    // Everything configurable is validated before the first request.
    let extractor = build_extractor(&run.llm)?;
    let client = HnClient::with_base_url(build_fetcher(fetch)?, &fetch.api_base)?;
    let locator = build_locator(fetch)?;

    tracing::info!(extractor = extractor.name(), "Starting crawl");

    if run.dry_run {
        let service = CrawlService::new(client, extractor, PrintStore::stdout(), config);
        crawl(&service, target, &locator).await?;
        return Ok(());
    }

    let repo = connect_db().await?;
    let service = CrawlService::new(client, extractor, repo.clone(), config);
    let summary = crawl(&service, target, &locator).await?;

    println!(
        "Visited {} of {} candidates: {} saved, {} skipped, {} failed",
        summary.visited, summary.candidates, summary.persisted, summary.skipped, summary.failed
    );

    if let Some(path) = run.export {
        let postings = repo.list_for_export().await?;
        export::export_to_path(&postings, &path)?;
    }

    Ok(())
}

async fn crawl<F, E, S>(
    service: &CrawlService<F, E, S>,
    target: Target,
    locator: &ThreadLocator<RetryingFetcher<ReqwestFetcher>>,
) -> Result<CrawlSummary>
where
    F: Fetcher,
    E: FieldExtractor,
    S: JobStore,
{
    let reporter = TracingCrawlReporter;
    let summary = match target {
        Target::Thread(id) => service.crawl_thread(id, &reporter).await?,
        Target::CurrentThread => service.crawl_current_thread(locator, &reporter).await?,
        Target::JobStories => service.crawl_job_stories(&reporter).await?,
    };
    Ok(summary)
}
