//! Run orchestration: acquire and extract every configured wishlist, tolerating
//! per-URL failures, and hand back the aggregate.

mod entry;

pub use entry::{build_acquirer, handle, InvocationStatus, RunDeps, RunStatus, TriggerContext};

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::extract::{extract_with_policy, ItemPolicy};
use crate::models::ItemRecord;
use crate::scrapers::PageAcquirer;

/// Markup shown in debug logs when a page fails to parse.
const EXCERPT_CHARS: usize = 500;

/// Where a URL failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Parse,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Parse => "parse",
        }
    }
}

/// A URL that contributed no records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlFailure {
    pub url: String,
    pub stage: FailureStage,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub item_policy: ItemPolicy,
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Capture time shared by every record.
    pub timestamp: DateTime<Utc>,
    /// Records in URL order, then rank order.
    pub records: Vec<ItemRecord>,
    pub failures: Vec<UrlFailure>,
    /// Item containers dropped under the isolating policy.
    pub skipped_items: usize,
    pub urls_attempted: usize,
}

impl RunOutcome {
    /// Every attempted URL failed.
    pub fn all_failed(&self) -> bool {
        self.urls_attempted > 0 && self.failures.len() == self.urls_attempted
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped_items == 0
    }
}

/// Run over `urls` with a fresh timestamp (UTC, whole seconds).
pub async fn run(urls: &[String], acquirer: &dyn PageAcquirer, options: RunOptions) -> RunOutcome {
    run_at(urls, acquirer, options, Utc::now().trunc_subsecs(0)).await
}

/// Run over `urls`, stamping every record with `timestamp`.
///
/// Never fails as a whole: fetch and parse failures are logged, recorded in
/// the outcome, and the next URL is processed. Duplicate URLs are processed
/// once per occurrence.
pub async fn run_at(
    urls: &[String],
    acquirer: &dyn PageAcquirer,
    options: RunOptions,
    timestamp: DateTime<Utc>,
) -> RunOutcome {
    let mut outcome = RunOutcome {
        timestamp,
        records: Vec::new(),
        failures: Vec::new(),
        skipped_items: 0,
        urls_attempted: urls.len(),
    };

    info!(
        "Scraping {} wishlist(s) in {} mode",
        urls.len(),
        acquirer.mode().as_str()
    );

    for url in urls {
        let markup = match acquirer.acquire(url).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!(url = %url, "Fetch failed: {}", e);
                outcome.failures.push(UrlFailure {
                    url: e.url().to_string(),
                    stage: FailureStage::Fetch,
                    message: e.to_string(),
                });
                continue;
            }
        };

        let page = match extract_with_policy(&markup, timestamp, options.item_policy) {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %url, "Parse failed: {}", e);
                debug!(url = %url, "Markup excerpt: {}", excerpt(&markup));
                outcome.failures.push(UrlFailure {
                    url: url.clone(),
                    stage: FailureStage::Parse,
                    message: e.to_string(),
                });
                continue;
            }
        };

        for skipped in &page.skipped {
            warn!(
                url = %url,
                rank = skipped.rank,
                item_id = %skipped.item_id,
                "Skipped malformed item: {}",
                skipped.reason
            );
        }

        info!(
            url = %url,
            list = %page.list_name,
            "Extracted {} item(s)",
            page.records.len()
        );

        outcome.skipped_items += page.skipped.len();
        outcome.records.extend(page.records);
    }

    outcome
}

fn excerpt(markup: &str) -> &str {
    match markup.char_indices().nth(EXCERPT_CHARS) {
        Some((idx, _)) => &markup[..idx],
        None => markup,
    }
}
