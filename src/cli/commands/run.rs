//! Full pipeline: scrape, write, report status.

use anyhow::Context;

use crate::config::Config;
use crate::pipeline::{self, RunDeps, RunOptions, TriggerContext};
use crate::repository::PgConnector;

/// Run once and print the invocation status as JSON. Exits with 1 on failure.
pub async fn cmd_run(config: &Config, trigger: &str) -> anyhow::Result<()> {
    config.scrape.validate_urls()?;
    let target = config.sink.target()?;
    let acquirer = pipeline::build_acquirer(config).context("Failed to build HTTP client")?;
    let secrets = config.secrets.build()?;

    let status = pipeline::handle(
        &TriggerContext::new(trigger),
        RunDeps {
            urls: &config.scrape.urls,
            options: RunOptions {
                item_policy: config.scrape.item_policy,
            },
            target: &target,
            acquirer: acquirer.as_ref(),
            secrets: secrets.as_ref(),
            connector: &PgConnector,
        },
    )
    .await;

    println!("{}", serde_json::to_string_pretty(&status)?);

    if status.status_code >= 500 {
        std::process::exit(1);
    }
    Ok(())
}
