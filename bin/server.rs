// Spendalyzer - Web Server
// Upload a statement export in the browser and chart it

use anyhow::{Context, Result};
use clap::Parser;
use spendalyzer::config::{load_config, DEFAULT_CONFIG_FILE};
use spendalyzer::logging;
use spendalyzer::server::{router, AppState};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spendalyzer-server", version, about = "Spendalyzer web dashboard")]
struct Args {
    /// Config file (missing file = defaults)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Overrides [server].bind
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    println!("🌐 Spendalyzer - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = load_config(&args.config)?;
    let zips = config.zip_lookup()?;
    let training = config.training_table()?;
    if let Some(table) = &training {
        println!("✓ Classifier training data: {} rows", table.len());
    }
    println!("✓ Postal codes: {}", zips.len());

    let addr = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let app = router(AppState::new(config, zips, training));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(%addr, "server listening");
    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/analyses", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
