// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spendalyzer::analysis::{run_analysis, AnalysisContext, AnalysisRequest, AnalysisType};
use spendalyzer::config::{init_config, load_config, Config, DEFAULT_CONFIG_FILE};
use spendalyzer::{load_statement, logging, TransactionTable};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "spendalyzer", version, about = "Explore a bank statement export")]
struct Cli {
    /// Config file (missing file = defaults)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the filename, columns, and first rows of an export
    Preview {
        file: PathBuf,
    },

    /// Run an analysis and print its charts
    Analyze {
        file: PathBuf,

        /// Analysis name or slug, e.g. "Bar Chart" or bar-chart
        #[arg(long, default_value = "all")]
        analysis: String,

        /// Categories in the top/bottom rankings (1-10)
        #[arg(long)]
        ranked: Option<usize>,

        /// Home zip code for "Spending by Location"
        #[arg(long)]
        zipcode: Option<String>,

        /// Print chart descriptions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Browse the export and its charts in the terminal
    Tui {
        file: PathBuf,

        #[arg(long)]
        zipcode: Option<String>,
    },

    /// Write a default config file
    ConfigInit,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // the TUI owns the terminal; log lines would tear its frames
    if !matches!(cli.command, Command::Tui { .. }) {
        logging::init();
    }

    match cli.command {
        Command::ConfigInit => init_config(&cli.config)?,
        Command::Preview { file } => {
            let cfg = load_config(&cli.config)?;
            run_preview(&file, &cfg)?;
        }
        Command::Analyze { file, analysis, ranked, zipcode, json } => {
            let cfg = load_config(&cli.config)?;
            let analysis: AnalysisType = analysis.parse()?;
            let request = AnalysisRequest {
                analysis,
                ranked: ranked.unwrap_or(cfg.analysis.ranked),
                zipcode,
            };
            run_analyze(&file, &cfg, &request, json)?;
        }
        Command::Tui { file, zipcode } => {
            let cfg = load_config(&cli.config)?;
            run_ui_mode(&file, cfg, zipcode)?;
        }
    }

    Ok(())
}

/// Load an export, showing users only the generic upload message on failure.
fn load_table(file: &Path) -> Result<TransactionTable> {
    load_statement(file).map_err(|e| {
        tracing::warn!(error = ?e, "upload rejected");
        anyhow::anyhow!(spendalyzer::UPLOAD_ERROR_MESSAGE)
    })
}

fn run_preview(file: &Path, cfg: &Config) -> Result<()> {
    let table = load_table(file)?;
    let preview = table.preview(cfg.ingest.page_size);

    println!("📂 {}", preview.filename);
    println!("   {} rows\n", preview.total_rows);
    println!("{}", preview.columns.join(" | "));
    for tx in &preview.rows {
        println!(
            "{} | {} | {:.2} | {} | {} | {} | {} | {}",
            tx.date.format("%m/%d/%Y"),
            tx.description,
            tx.amount,
            tx.address,
            tx.city_state,
            tx.zip_code,
            tx.country,
            tx.category
        );
    }
    Ok(())
}

fn run_analyze(file: &Path, cfg: &Config, request: &AnalysisRequest, json: bool) -> Result<()> {
    let table = load_table(file)?;
    let zips = cfg.zip_lookup()?;
    let training = cfg.training_table()?;
    let ctx = AnalysisContext::new(cfg, &zips, training.as_ref());

    let charts = run_analysis(&table, request, &ctx)?;

    if json {
        let text = serde_json::to_string_pretty(&charts).context("serialize charts")?;
        println!("{}", text);
    } else {
        for chart in &charts {
            for line in chart.summary() {
                println!("{}", line);
            }
            println!();
        }
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(file: &Path, cfg: Config, zipcode: Option<String>) -> Result<()> {
    let table = load_table(file)?;
    let zips = cfg.zip_lookup()?;
    let training = cfg.training_table()?;

    println!("✓ Loaded {} transactions from {}", table.len(), table.filename);
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(table, cfg, zips, training, zipcode);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_file: &Path, _cfg: Config, _zipcode: Option<String>) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use web UI: cargo run --bin spendalyzer-server --features server");
    std::process::exit(1);
}
