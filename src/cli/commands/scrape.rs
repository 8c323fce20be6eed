//! Scrape without writing: acquire, extract, print the report.

use std::path::Path;

use anyhow::Context;
use console::style;

use crate::cli::icons::{dim_arrow, error, success, warn};
use crate::config::Config;
use crate::extract::ItemPolicy;
use crate::pipeline::{self, RunOptions};
use crate::report;
use crate::scrapers::AcquireMode;

/// Command-line replacements for configured scrape settings.
#[derive(Debug, Default)]
pub struct ScrapeOverrides {
    pub mode: Option<AcquireMode>,
    pub urls: Vec<String>,
    pub item_policy: Option<ItemPolicy>,
}

impl ScrapeOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(mode) = self.mode {
            config.scrape.mode = mode;
        }
        if !self.urls.is_empty() {
            config.scrape.urls = self.urls;
        }
        if let Some(policy) = self.item_policy {
            config.scrape.item_policy = policy;
        }
    }
}

pub async fn cmd_scrape(
    mut config: Config,
    overrides: ScrapeOverrides,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    overrides.apply(&mut config);
    config.scrape.validate_urls()?;

    let acquirer = pipeline::build_acquirer(&config).context("Failed to build HTTP client")?;
    let outcome = pipeline::run(
        &config.scrape.urls,
        acquirer.as_ref(),
        RunOptions {
            item_policy: config.scrape.item_policy,
        },
    )
    .await;

    let table = report::render(&outcome.records);
    match output {
        Some(path) => {
            tokio::fs::write(path, &table)
                .await
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!(
                "{} Wrote {} record(s) to {}",
                success(),
                outcome.records.len(),
                path.display()
            );
        }
        None => print!("{}", table),
    }

    for failure in &outcome.failures {
        eprintln!(
            "{} {} failed: {}",
            error(),
            failure.stage.as_str(),
            style(&failure.url).dim()
        );
        eprintln!("  {} {}", dim_arrow(), failure.message);
    }
    if outcome.skipped_items > 0 {
        eprintln!(
            "{} {} malformed item(s) skipped",
            warn(),
            outcome.skipped_items
        );
    }

    Ok(())
}
