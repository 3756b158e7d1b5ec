//! PQ Analyzer - IEEE 519-2022 harmonic compliance
//!
//! # Usage
//!
//! ```bash
//! # Analyze one logger export (worksheets saved as CSV)
//! pq-analyzer analyze --trend trend.csv --vh vh.csv --ah ah.csv \
//!     --nominal-voltage 400 --isc 1000 --il 50 --pretty
//!
//! # Run the HTTP service
//! pq-analyzer serve --addr 0.0.0.0:8080
//! ```
//!
//! # Environment Variables
//!
//! - `PQ_CONFIG`: Path to the TOML config file (default: ./pq_config.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use pq_analyzer::acquisition::{load_workbook, CsvLayout};
use pq_analyzer::api::{self, ApiState};
use pq_analyzer::config::{self, AnalyzerConfig};
use pq_analyzer::{AnalysisSettings, PowerQualityAnalyzer, SystemParameters};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "pq-analyzer")]
#[command(about = "IEEE 519-2022 harmonic compliance analyzer")]
#[command(version)]
struct CliArgs {
    /// Config file (overrides PQ_CONFIG and ./pq_config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Analyze one logger export and print the JSON report
    Analyze {
        /// Trend worksheet (CSV)
        #[arg(long)]
        trend: PathBuf,
        /// Voltage harmonic worksheet "Vh Harmonic %" (CSV)
        #[arg(long)]
        vh: PathBuf,
        /// Current harmonic worksheet "Ah Harmonic %" (CSV)
        #[arg(long)]
        ah: PathBuf,
        /// Nominal system voltage at the PCC (V)
        #[arg(long)]
        nominal_voltage: f64,
        /// Short-circuit current at the PCC (A)
        #[arg(long)]
        isc: f64,
        /// Maximum demand load current at the PCC (A)
        #[arg(long)]
        il: f64,
        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Override the server address (default from config: "0.0.0.0:8080")
        #[arg(short, long, value_name = "HOST:PORT", env = "PQ_SERVER_ADDR")]
        addr: Option<String>,
    },
}

// ============================================================================
// Commands
// ============================================================================

fn run_analyze(
    config: &AnalyzerConfig,
    tables: (PathBuf, PathBuf, PathBuf),
    params: SystemParameters,
    pretty: bool,
) -> Result<()> {
    let (trend, vh, ah) = tables;
    let workbook = load_workbook(&trend, &vh, &ah, CsvLayout::trend(&config.input))
        .context("Failed to load worksheets")?;

    let analyzer = PowerQualityAnalyzer::new(AnalysisSettings::from(&config.analysis));
    let report = analyzer.analyze(&workbook, &params)?;

    let json = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}

async fn run_server(config: &AnalyzerConfig, addr: Option<String>) -> Result<()> {
    let server_addr = addr.unwrap_or_else(|| config.server.addr.clone());
    let state = ApiState::new(AnalysisSettings::from(&config.analysis));
    let app = api::create_app(state, &config.server);

    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind {}", server_addr))?;
    info!(addr = %server_addr, "HTTP server listening");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received Ctrl+C, shutting down");
        })
        .await;

    match result {
        Ok(()) => {
            info!("Graceful shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Server error: {}", e);
            Err(anyhow::anyhow!("HTTP server error: {}", e))
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    // Load configuration
    let analyzer_config = match &args.config {
        Some(path) => AnalyzerConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalyzerConfig::load(),
    };
    config::init(analyzer_config);
    let config = config::get();

    match args.command {
        SubCommand::Analyze {
            trend,
            vh,
            ah,
            nominal_voltage,
            isc,
            il,
            pretty,
        } => run_analyze(
            config,
            (trend, vh, ah),
            SystemParameters {
                nominal_voltage,
                isc,
                il,
            },
            pretty,
        ),
        SubCommand::Serve { addr } => run_server(config, addr).await,
    }
}
