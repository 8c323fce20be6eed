//! Sink writer: persists one run's records as an append-only batch.
//!
//! The writer is generic over where credentials and connections come from so
//! runs can be exercised without a database. PostgreSQL is the production store.

mod pg_tls;
mod postgres;
mod util;

pub use postgres::{PgConnector, PgStore};
pub use util::{build_insert, quote_ident, COLUMNS};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::ItemRecord;
use crate::secrets::{DbSecret, SecretError, SecretLookup};

/// Fully resolved write destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkTarget {
    pub secret_name: String,
    pub region: String,
    pub database: String,
    pub table: String,
    pub batch_size: usize,
    pub no_tls: bool,
}

/// Result of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum WriteOutcome {
    /// Nothing to write; no secret lookup and no connection were made.
    Skipped,
    Written { rows: usize },
}

/// The write failed. Nothing was committed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("secret lookup failed: {0}")]
    Secret(#[from] SecretError),

    #[error("failed to connect to {target}: {message}")]
    Connect { target: String, message: String },

    #[error("insert into {table} failed: {message}")]
    Insert { table: String, message: String },
}

/// Opens a store from resolved credentials.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(
        &self,
        secret: &DbSecret,
        target: &SinkTarget,
    ) -> Result<Box<dyn ItemStore>, StorageError>;
}

/// An open connection able to insert records atomically.
#[async_trait]
pub trait ItemStore: Send {
    /// Insert every record in one transaction, `batch_size` rows per statement.
    /// Returns the number of rows inserted.
    async fn insert_all(
        &mut self,
        table: &str,
        records: &[ItemRecord],
        batch_size: usize,
    ) -> Result<usize, StorageError>;
}

/// Write the run's aggregate to the sink.
///
/// An empty aggregate is skipped without touching the secret lookup or the
/// database. Otherwise the secret is fetched once, one connection is opened
/// and all records are committed together.
pub async fn write(
    records: &[ItemRecord],
    target: &SinkTarget,
    secrets: &dyn SecretLookup,
    connector: &dyn StoreConnector,
) -> Result<WriteOutcome, StorageError> {
    if records.is_empty() {
        info!("No data collected, skipping database write");
        return Ok(WriteOutcome::Skipped);
    }

    let secret = secrets
        .get_secret(&target.secret_name, &target.region)
        .await?;
    debug!("Resolved credentials for {}", secret.host);

    let mut store = connector.connect(&secret, target).await?;
    let rows = store
        .insert_all(&target.table, records, target.batch_size)
        .await?;

    info!("Wrote {} rows to {}", rows, target.table);
    Ok(WriteOutcome::Written { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Price;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct CountingSecrets {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SecretLookup for CountingSecrets {
        async fn get_secret(&self, name: &str, region: &str) -> Result<DbSecret, SecretError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SecretError::NotFound {
                    name: name.to_string(),
                    region: region.to_string(),
                });
            }
            Ok(DbSecret {
                host: "db.test".into(),
                username: "u".into(),
                password: "p".into(),
                port: 5432,
            })
        }
    }

    #[derive(Default)]
    struct RecordingConnector {
        connects: AtomicUsize,
        inserted: Arc<Mutex<Vec<(String, usize, usize)>>>,
        fail_insert: bool,
    }

    struct RecordingStore {
        inserted: Arc<Mutex<Vec<(String, usize, usize)>>>,
        fail: bool,
    }

    #[async_trait]
    impl StoreConnector for RecordingConnector {
        async fn connect(
            &self,
            _secret: &DbSecret,
            _target: &SinkTarget,
        ) -> Result<Box<dyn ItemStore>, StorageError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(RecordingStore {
                inserted: self.inserted.clone(),
                fail: self.fail_insert,
            }))
        }
    }

    #[async_trait]
    impl ItemStore for RecordingStore {
        async fn insert_all(
            &mut self,
            table: &str,
            records: &[ItemRecord],
            batch_size: usize,
        ) -> Result<usize, StorageError> {
            if self.fail {
                return Err(StorageError::Insert {
                    table: table.to_string(),
                    message: "relation does not exist".into(),
                });
            }
            self.inserted
                .lock()
                .unwrap()
                .push((table.to_string(), records.len(), batch_size));
            Ok(records.len())
        }
    }

    fn secrets(fail: bool) -> CountingSecrets {
        CountingSecrets {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    fn target() -> SinkTarget {
        SinkTarget {
            secret_name: "db".into(),
            region: "us-east-1".into(),
            database: "wishlists".into(),
            table: "items".into(),
            batch_size: 1000,
            no_tls: true,
        }
    }

    fn record(rank: u32) -> ItemRecord {
        ItemRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            list_name: "Classroom".into(),
            rank,
            item_id: format!("ITEM{}", rank),
            item_name: "Crayons".into(),
            price: Price::Amount(4.5),
            requested: 2,
            purchased: 1,
        }
    }

    #[tokio::test]
    async fn test_empty_aggregate_skips_everything() {
        let secrets = secrets(false);
        let connector = RecordingConnector::default();

        let outcome = write(&[], &target(), &secrets, &connector).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Skipped);
        assert_eq!(secrets.calls.load(Ordering::SeqCst), 0);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        assert!(connector.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_uses_one_secret_and_one_connection() {
        let secrets = secrets(false);
        let connector = RecordingConnector::default();
        let records = vec![record(1), record(2), record(3)];

        let outcome = write(&records, &target(), &secrets, &connector).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Written { rows: 3 });
        assert_eq!(secrets.calls.load(Ordering::SeqCst), 1);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(
            *connector.inserted.lock().unwrap(),
            vec![("items".to_string(), 3, 1000)]
        );
    }

    #[tokio::test]
    async fn test_secret_failure_stops_before_connect() {
        let secrets = secrets(true);
        let connector = RecordingConnector::default();

        let err = write(&[record(1)], &target(), &secrets, &connector)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Secret(SecretError::NotFound { .. })));
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_insert_failure_propagates() {
        let secrets = secrets(false);
        let connector = RecordingConnector {
            fail_insert: true,
            ..Default::default()
        };

        let err = write(&[record(1)], &target(), &secrets, &connector)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Insert { ref table, .. } if table == "items"));
    }
}
