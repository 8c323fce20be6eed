//! Offline extraction from a saved page.

use std::path::Path;

use anyhow::Context;
use chrono::{SubsecRound, Utc};

use crate::cli::icons::warn;
use crate::extract::{extract_with_policy, ItemPolicy};
use crate::report;

pub async fn cmd_parse(file: &Path, policy: ItemPolicy) -> anyhow::Result<()> {
    let markup = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let page = extract_with_policy(&markup, Utc::now().trunc_subsecs(0), policy)
        .with_context(|| format!("Failed to extract {}", file.display()))?;

    println!("{}", page.list_name);
    print!("{}", report::render(&page.records));

    for skipped in &page.skipped {
        eprintln!(
            "{} item #{} ({}) skipped: {}",
            warn(),
            skipped.rank,
            skipped.item_id,
            skipped.reason
        );
    }

    Ok(())
}
