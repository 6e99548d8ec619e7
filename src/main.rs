//! Sweeper CLI
//!
//! Runs file maintenance rules once, or serves runs over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use sweeper::{Config, ExecuteOptions, runner::DEFAULT_CONCURRENCY};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sweeper")]
#[command(author, version, about = "Rule-driven file maintenance")]
struct Cli {
    /// Path to config file (defaults to $SWEEPER_CONFIG_FILE or conf.yaml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Execute all rules once (default)
    Run {
        /// Log actions without touching any files
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of tasks in flight
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Serve rule execution over HTTP
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, default_value_t = 8081)]
        port: u16,

        /// Maximum number of tasks in flight per run
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Validate config file
    Check,

    /// Open the config file in $EDITOR
    Configure,

    /// List supported filters
    Filters,

    /// List supported actions
    Actions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("SWEEPER_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = cli.config.unwrap_or_else(Config::default_path);

    match cli.command.unwrap_or(Commands::Run {
        dry_run: false,
        concurrency: DEFAULT_CONCURRENCY,
    }) {
        Commands::Run {
            dry_run,
            concurrency,
        } => {
            let config = Config::load(Some(&config_path))?;

            info!("Starting execute rules...");
            let start = Instant::now();
            sweeper::execute(
                config,
                ExecuteOptions {
                    concurrency,
                    dry_run,
                },
            )
            .await?;
            info!("Done in {:?}.", start.elapsed());
        }
        Commands::Serve {
            host,
            port,
            concurrency,
        } => {
            let state = sweeper::http::AppState {
                config_path,
                options: ExecuteOptions {
                    concurrency,
                    dry_run: false,
                },
            };
            sweeper::http::serve(&host, port, state).await?;
        }
        Commands::Check => match Config::load(Some(&config_path)) {
            Ok(config) => {
                println!("✓ Config is valid");
                println!("  {} rules", config.rules.len());
                for rule in &config.rules {
                    println!(
                        "  - {} ({} filters, {} actions{})",
                        rule.label(),
                        rule.filters.len(),
                        rule.actions.len(),
                        if rule.recursive { ", recursive" } else { "" }
                    );
                }
            }
            Err(e) => {
                eprintln!("✗ Config error: {:#}", e);
                std::process::exit(1);
            }
        },
        Commands::Configure => {
            open_in_editor(&config_path)?;
        }
        Commands::Filters => {
            println!("Filters:");
            for filter in sweeper::rules::FILTERS {
                println!("\t- {}", filter);
            }
        }
        Commands::Actions => {
            println!("Actions:");
            for action in sweeper::rules::ACTIONS {
                println!("\t- {}", action);
            }
        }
    }

    Ok(())
}

/// Open a file in $EDITOR (vi when unset) and wait for it to exit
fn open_in_editor(path: &Path) -> Result<()> {
    let editor = std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "vi".to_string());

    let status = std::process::Command::new(&editor)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor))?;

    if !status.success() {
        anyhow::bail!("Editor exited with status: {}", status);
    }
    Ok(())
}
