use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use crawler::{CrawlerConfig, Orchestrator};
use search_core::response::{ApiResponse, StatisticsBody};
use search_core::search::{search, SearchRequest, DEFAULT_LIMIT};
use search_core::stats::statistics;
use search_core::{MemoryStore, Store};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Crawl configured sites into the lemma index and query it", long_about = None)]
struct Cli {
    /// Index data directory
    #[arg(long, global = true, default_value = "./data")]
    data: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every configured site from scratch
    Crawl {
        /// Crawler configuration (JSON)
        #[arg(long, default_value = "./config.json")]
        config: String,
    },
    /// Reindex one page of a configured site
    Page {
        #[arg(long, default_value = "./config.json")]
        config: String,
        /// Absolute URL, or a path starting with `/` for every site
        #[arg(long)]
        url: String,
    },
    /// Run a query against the index
    Search {
        #[arg(long)]
        query: String,
        /// Restrict to one site base URL
        #[arg(long)]
        site: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Print index statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let store: Arc<dyn Store> = Arc::new(MemoryStore::open(&cli.data)?);

    match cli.command {
        Commands::Crawl { config } => {
            let orchestrator = load_orchestrator(&config, store.clone())?;
            orchestrator.start_indexing()?;
            run_until_idle(&orchestrator).await?;
            print_stats(store.as_ref())?;
        }
        Commands::Page { config, url } => {
            let orchestrator = load_orchestrator(&config, store.clone())?;
            orchestrator.index_page(&url)?;
            run_until_idle(&orchestrator).await?;
            print_stats(store.as_ref())?;
        }
        Commands::Search { query, site, offset, limit } => {
            let request = SearchRequest { query, site, offset, limit };
            let response: ApiResponse<_> = search(store.as_ref(), &request).into();
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.is_success() {
                return Err(anyhow!("search failed"));
            }
        }
        Commands::Stats => print_stats(store.as_ref())?,
    }

    store.flush()?;
    Ok(())
}

fn load_orchestrator(config: &str, store: Arc<dyn Store>) -> Result<Orchestrator> {
    let config = CrawlerConfig::load(config)?;
    Orchestrator::with_http(config, store)
}

/// Wait for the runs to drain, stopping them on ctrl-c.
async fn run_until_idle(orchestrator: &Orchestrator) -> Result<()> {
    let mut interrupted = std::pin::pin!(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            idle = orchestrator.wait_until_idle(PROGRESS_INTERVAL) => {
                if idle {
                    return Ok(());
                }
                let totals = statistics(orchestrator.store().as_ref())?.total;
                tracing::info!(sites = totals.sites, pages = totals.pages, lemmas = totals.lemmas, "crawling");
            }
            _ = &mut interrupted => {
                tracing::warn!("interrupted, stopping indexing");
                orchestrator.stop_indexing().await?;
                return Ok(());
            }
        }
    }
}

fn print_stats(store: &dyn Store) -> Result<()> {
    let response = ApiResponse::Success(StatisticsBody { statistics: statistics(store)? });
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
