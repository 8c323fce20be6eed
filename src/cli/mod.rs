//! Command-line interface.

mod commands;
mod icons;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::extract::ItemPolicy;
use crate::scrapers::AcquireMode;

#[derive(Parser)]
#[command(name = "wishtrack")]
#[command(about = "Wishlist snapshot scraper with append-only PostgreSQL history")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every configured wishlist and append the records to the database
    Run {
        /// Label recorded with the invocation (e.g. "cron", "manual")
        #[arg(long, default_value = "cli")]
        trigger: String,
    },

    /// Scrape and print the report without touching the database
    Scrape {
        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Acquisition mode (overrides config)
        #[arg(long, value_enum)]
        mode: Option<AcquireMode>,

        /// Wishlist URL (repeatable; replaces the configured list)
        #[arg(long = "url")]
        urls: Vec<String>,

        /// Per-item failure policy (overrides config)
        #[arg(long, value_enum)]
        item_policy: Option<ItemPolicy>,
    },

    /// Extract records from a saved wishlist page
    Parse {
        /// HTML file to parse
        file: PathBuf,

        /// Per-item failure policy (overrides config)
        #[arg(long, value_enum)]
        item_policy: Option<ItemPolicy>,
    },

    /// Print the effective configuration
    Config,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Run { trigger } => commands::run::cmd_run(&config, &trigger).await,
        Commands::Scrape {
            output,
            mode,
            urls,
            item_policy,
        } => {
            let overrides = commands::scrape::ScrapeOverrides {
                mode,
                urls,
                item_policy,
            };
            commands::scrape::cmd_scrape(config, overrides, output.as_deref()).await
        }
        Commands::Parse { file, item_policy } => {
            commands::parse::cmd_parse(
                &file,
                item_policy.unwrap_or(config.scrape.item_policy),
            )
            .await
        }
        Commands::Config => commands::config_cmd::cmd_config_show(&config),
    }
}
