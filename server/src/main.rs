use anyhow::Result;
use clap::Parser;
use crawler::{CrawlerConfig, Orchestrator};
use search_core::{MemoryStore, Store};
use server::build_app;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Crawler configuration (JSON)
    #[arg(long, default_value = "./config.json")]
    config: String,
    /// Index data directory
    #[arg(long, default_value = "./data")]
    data: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let config = CrawlerConfig::load(&args.config)?;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::open(&args.data)?);
    let orchestrator = Arc::new(Orchestrator::with_http(config, store.clone())?);
    let app = build_app(orchestrator);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, data = %args.data, "server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    store.flush()?;
    tracing::info!("index saved, bye");
    Ok(())
}
