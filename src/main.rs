//! wishtrack - wishlist snapshot scraper.
//!
//! Fetches wishlist pages, extracts item records and appends them, timestamped,
//! to a PostgreSQL history table.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wishtrack::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "wishtrack=debug"
    } else {
        "wishtrack=info"
    };

    // stdout carries reports and status JSON; logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Run CLI
    cli::run().await
}
