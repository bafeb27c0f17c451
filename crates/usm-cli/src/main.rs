//! USM CLI - line-oriented simulator for the USM/FUM collateral pool

use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use usm_cli::{OutputFormat, Session};
use usm_core::{EngineConfig, PoolEngine};

/// USM CLI application
#[derive(Parser)]
#[command(name = "usm")]
#[command(about = "USM - simulate a two-token collateral pool", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine configuration file (TOML); defaults apply when absent
    #[arg(short, long, env = "USM_CONFIG")]
    config: Option<PathBuf>,

    /// Instruction script; reads stdin when omitted
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(io::stderr),
        )
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let engine = PoolEngine::new(config).context("starting pool engine")?;

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();

    let summary = match &cli.script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening script {}", path.display()))?;
            Session::new(engine, cli.output).run(BufReader::new(file), &mut out, &mut err)?
        }
        None => {
            let stdin = io::stdin();
            let interactive = stdin.is_terminal();
            Session::new(engine, cli.output)
                .interactive(interactive)
                .run(stdin.lock(), &mut out, &mut err)?
        }
    };

    info!(
        executed = summary.executed,
        rejected = summary.rejected,
        "Session finished"
    );
    Ok(())
}
