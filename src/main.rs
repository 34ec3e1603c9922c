//! # MORODAS OS Server
//!
//! Internal operations server for the agency dashboard: agent metadata,
//! recurring triggers, the cron-invoked due-trigger sweep, and the run
//! audit trail. The actual workflow execution is delegated to an external
//! workflow server over HTTP.
//!
//! Usage:
//!   morodas                          # Start the gateway (default port 8790)
//!   morodas --port 9000              # Custom port
//!   morodas --db-path ./morodas.db   # Custom database location

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use morodas_core::MorodasConfig;
use morodas_db::MorodasDb;

#[derive(Parser)]
#[command(
    name = "morodas",
    version,
    about = "📋 MORODAS OS — agency operations server"
)]
struct Cli {
    /// Gateway port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file path (default: ~/.morodas/config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Database path (overrides config)
    #[arg(long)]
    db_path: Option<String>,

    /// Workflow server base URL (overrides config)
    #[arg(long)]
    workflow_url: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "morodas=debug,tower_http=debug"
    } else {
        "morodas=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Load config, then apply CLI and env overrides
    let mut config = match &cli.config {
        Some(path) => MorodasConfig::load_from(Path::new(&expand_path(path)))?,
        None => MorodasConfig::load()?,
    };
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if let Some(db_path) = &cli.db_path {
        config.database.path = db_path.clone();
    }
    if let Some(url) = &cli.workflow_url {
        config.workflow.base_url = url.clone();
    }
    // Secrets prefer env vars over the config file
    if let Ok(secret) = std::env::var("MORODAS_SWEEP_SECRET") {
        config.gateway.sweep_secret = secret;
    }
    if let Ok(token) = std::env::var("MORODAS_API_TOKEN") {
        config.gateway.api_token = token;
    }

    // Open the database
    let db_path = expand_path(&config.database.path);
    if let Some(parent) = Path::new(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = MorodasDb::open(Path::new(&db_path))?;

    println!("📋 MORODAS OS v{}", env!("CARGO_PKG_VERSION"));
    println!("   🌐 Gateway:  http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   🗄️  Database: {db_path}");
    if config.workflow.base_url.is_empty() {
        println!("   🔌 Workflow server: not configured (firings recorded locally)");
    } else {
        println!("   🔌 Workflow server: {}", config.workflow.base_url);
    }
    println!("   ⏰ Point your cron at: POST /api/v1/sweep (recommended: once per minute)");
    println!();

    if config.gateway.sweep_secret.is_empty() {
        tracing::warn!("⚠️  No sweep secret set! Configure MORODAS_SWEEP_SECRET to enable the sweep endpoint.");
    }

    morodas_gateway::server::start(&config, Arc::new(db)).await?;
    Ok(())
}
