//! Invocation entry point: one scheduled run from trigger to status.

use serde::Serialize;
use tracing::{error, info};

use super::{run, RunOptions, RunOutcome};
use crate::config::Config;
use crate::report;
use crate::repository::{self, SinkTarget, StorageError, StoreConnector, WriteOutcome};
use crate::scrapers::{
    resolve_user_agent, AcquireMode, BrowserAcquirer, HttpAcquirer, PageAcquirer,
};
use crate::secrets::SecretLookup;

/// What started the run. Opaque; only logged.
#[derive(Debug, Clone, Default)]
pub struct TriggerContext {
    pub source: String,
    pub payload: Option<serde_json::Value>,
}

impl TriggerContext {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            payload: None,
        }
    }
}

/// Coarse result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every URL succeeded and the write succeeded (or there was nothing to write).
    Complete,
    /// Some URLs failed or items were skipped, but what was collected was written.
    Partial,
    /// The write failed, or no URL succeeded.
    Failed,
}

impl RunStatus {
    pub fn code(&self) -> u16 {
        match self {
            Self::Complete => 200,
            Self::Partial => 207,
            Self::Failed => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

/// Status returned to the invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationStatus {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

/// Everything a run needs, passed in explicitly.
pub struct RunDeps<'a> {
    pub urls: &'a [String],
    pub options: RunOptions,
    pub target: &'a SinkTarget,
    pub acquirer: &'a dyn PageAcquirer,
    pub secrets: &'a dyn SecretLookup,
    pub connector: &'a dyn StoreConnector,
}

/// Run the pipeline once: scrape, log the report, write, classify.
pub async fn handle(trigger: &TriggerContext, deps: RunDeps<'_>) -> InvocationStatus {
    info!(
        source = %trigger.source,
        has_payload = trigger.payload.is_some(),
        "Invocation started"
    );

    let outcome = run(deps.urls, deps.acquirer, deps.options).await;

    if !outcome.records.is_empty() {
        info!("Collected records:\n{}", report::render(&outcome.records));
    }

    let written =
        repository::write(&outcome.records, deps.target, deps.secrets, deps.connector).await;
    if let Err(ref e) = written {
        error!("Database write failed: {}", e);
    }

    let (status, body) = classify(&outcome, &written);
    info!(status = status.as_str(), "Invocation finished: {}", body);

    InvocationStatus {
        status_code: status.code(),
        body,
    }
}

fn classify(
    outcome: &RunOutcome,
    written: &Result<WriteOutcome, StorageError>,
) -> (RunStatus, String) {
    let rows = match written {
        Err(e) => return (RunStatus::Failed, format!("failed: {}", e)),
        Ok(WriteOutcome::Skipped) => 0,
        Ok(WriteOutcome::Written { rows }) => *rows,
    };

    if outcome.all_failed() {
        return (
            RunStatus::Failed,
            format!("failed: all {} wishlist URL(s) failed", outcome.urls_attempted),
        );
    }

    if !outcome.is_clean() {
        return (
            RunStatus::Partial,
            format!(
                "partial: wrote {} row(s); {} of {} URL(s) failed; {} item(s) skipped",
                rows,
                outcome.failures.len(),
                outcome.urls_attempted,
                outcome.skipped_items
            ),
        );
    }

    if rows == 0 {
        (
            RunStatus::Complete,
            "invoked, but no data collected".to_string(),
        )
    } else {
        (RunStatus::Complete, format!("invoked: wrote {} row(s)", rows))
    }
}

/// Build the acquirer selected by `scrape.mode`.
pub fn build_acquirer(config: &Config) -> Result<Box<dyn PageAcquirer>, reqwest::Error> {
    let scrape = &config.scrape;
    match scrape.mode {
        AcquireMode::Static => Ok(Box::new(HttpAcquirer::new(
            scrape.request_timeout(),
            scrape.user_agent.as_deref(),
        )?)),
        AcquireMode::Rendered => Ok(Box::new(BrowserAcquirer::new(
            config.browser.clone(),
            scrape.scroll.clone(),
            resolve_user_agent(scrape.user_agent.as_deref()),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{item, page, FakeAcquirer};
    use crate::pipeline::{FailureStage, UrlFailure};
    use crate::repository::ItemStore;
    use crate::secrets::{DbSecret, SecretError};
    use async_trait::async_trait;
    use chrono::Utc;

    struct StaticSecrets;

    #[async_trait]
    impl SecretLookup for StaticSecrets {
        async fn get_secret(&self, _name: &str, _region: &str) -> Result<DbSecret, SecretError> {
            Ok(DbSecret {
                host: "localhost".into(),
                username: "u".into(),
                password: "p".into(),
                port: 5432,
            })
        }
    }

    struct Connector {
        fail: bool,
    }

    struct Store;

    #[async_trait]
    impl StoreConnector for Connector {
        async fn connect(
            &self,
            _secret: &DbSecret,
            target: &SinkTarget,
        ) -> Result<Box<dyn ItemStore>, StorageError> {
            if self.fail {
                return Err(StorageError::Connect {
                    target: target.database.clone(),
                    message: "connection refused".into(),
                });
            }
            Ok(Box::new(Store))
        }
    }

    #[async_trait]
    impl ItemStore for Store {
        async fn insert_all(
            &mut self,
            _table: &str,
            records: &[crate::models::ItemRecord],
            _batch_size: usize,
        ) -> Result<usize, StorageError> {
            Ok(records.len())
        }
    }

    fn target() -> SinkTarget {
        SinkTarget {
            secret_name: "s".into(),
            region: "r".into(),
            database: "d".into(),
            table: "t".into(),
            batch_size: 1000,
            no_tls: true,
        }
    }

    async fn invoke(acquirer: &FakeAcquirer, urls: &[&str], fail_connect: bool) -> InvocationStatus {
        let urls: Vec<String> = urls.iter().map(|s| s.to_string()).collect();
        let target = target();
        let connector = Connector { fail: fail_connect };
        handle(
            &TriggerContext::new("test"),
            RunDeps {
                urls: &urls,
                options: RunOptions::default(),
                target: &target,
                acquirer,
                secrets: &StaticSecrets,
                connector: &connector,
            },
        )
        .await
    }

    fn good_page() -> String {
        page("Music", &[item("M1", "Recorder", "6.50", 3, 1)])
    }

    #[tokio::test]
    async fn test_complete_run() {
        let acquirer = FakeAcquirer::default().with_page("https://a.example/", good_page());
        let status = invoke(&acquirer, &["https://a.example/"], false).await;
        assert_eq!(status.status_code, 200);
        assert_eq!(status.body, "invoked: wrote 1 row(s)");
    }

    #[tokio::test]
    async fn test_no_data_is_success() {
        let acquirer =
            FakeAcquirer::default().with_page("https://a.example/", page("Empty list", &[]));
        let status = invoke(&acquirer, &["https://a.example/"], true).await;
        assert_eq!(status.status_code, 200);
        assert_eq!(status.body, "invoked, but no data collected");
    }

    #[tokio::test]
    async fn test_partial_run() {
        let acquirer = FakeAcquirer::default().with_page("https://b.example/", good_page());
        let status = invoke(&acquirer, &["https://a.example/", "https://b.example/"], false).await;
        assert_eq!(status.status_code, 207);
        assert!(status.body.contains("1 of 2 URL(s) failed"));
    }

    #[tokio::test]
    async fn test_all_urls_failed() {
        let acquirer = FakeAcquirer::default();
        let status = invoke(&acquirer, &["https://a.example/"], false).await;
        assert_eq!(status.status_code, 500);
        assert!(status.body.starts_with("failed: all 1"));
    }

    #[tokio::test]
    async fn test_write_failure() {
        let acquirer = FakeAcquirer::default().with_page("https://a.example/", good_page());
        let status = invoke(&acquirer, &["https://a.example/"], true).await;
        assert_eq!(status.status_code, 500);
        assert!(status.body.contains("connection refused"));
    }

    #[test]
    fn test_classify_skipped_items_is_partial() {
        let outcome = RunOutcome {
            timestamp: Utc::now(),
            records: Vec::new(),
            failures: Vec::new(),
            skipped_items: 2,
            urls_attempted: 1,
        };
        let (status, _) = classify(&outcome, &Ok(WriteOutcome::Skipped));
        assert_eq!(status, RunStatus::Partial);

        let outcome = RunOutcome {
            skipped_items: 0,
            failures: vec![UrlFailure {
                url: "u".into(),
                stage: FailureStage::Parse,
                message: "list-name-not-found".into(),
            }],
            ..outcome
        };
        let (status, body) = classify(&outcome, &Ok(WriteOutcome::Skipped));
        assert_eq!(status, RunStatus::Failed);
        assert_eq!(body, "failed: all 1 wishlist URL(s) failed");
    }

    #[test]
    fn test_status_serializes_with_status_code_key() {
        let status = InvocationStatus {
            status_code: 207,
            body: "partial".into(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["statusCode"], 207);
        assert_eq!(json["body"], "partial");
    }

    #[test]
    fn test_build_acquirer_follows_mode() {
        let mut config = Config::default();
        assert_eq!(build_acquirer(&config).unwrap().mode(), AcquireMode::Static);

        config.scrape.mode = AcquireMode::Rendered;
        assert_eq!(build_acquirer(&config).unwrap().mode(), AcquireMode::Rendered);
    }
}
