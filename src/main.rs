//! sitedeploy CLI - deploy or destroy the S3 website stack
//!
//! `sitedeploy` runs an update, `sitedeploy destroy` tears the stack down.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use sitedeploy::tui::{self, ExitReason};
use sitedeploy::{ApplyMode, DeployConfig, DeployError, DeployOutcome, FixSuggestion};

#[derive(Parser)]
#[command(name = "sitedeploy")]
#[command(about = "Deploy a static S3 website with Pulumi and watch it happen")]
#[command(version)]
struct Cli {
    /// `destroy` tears the stack down; anything else (or nothing) runs an update
    mode: Option<String>,

    #[arg(hide = true)]
    rest: Vec<String>,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    // Logs go to stderr; the TUI owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mode = ApplyMode::from_arg(cli.mode.as_deref());
    tracing::debug!("selected mode: {}", mode);

    if let Err(e) = run(mode).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

/// `RUST_LOG` when set, warnings only otherwise
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

async fn run(mode: ApplyMode) -> Result<(), DeployError> {
    let config = DeployConfig::from_env()?;

    match tui::run(config, mode).await? {
        ExitReason::Completed(DeployOutcome::Succeeded) => {
            tracing::info!("{} finished", mode);
        }
        ExitReason::Completed(DeployOutcome::Failed(reason)) => {
            tracing::warn!("{} failed: {}", mode, reason);
        }
        ExitReason::Interrupted => {
            tracing::info!("interrupted by user");
        }
    }
    Ok(())
}
