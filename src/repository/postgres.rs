//! PostgreSQL-backed item store.

use async_trait::async_trait;
use chrono::{NaiveDateTime, SubsecRound};
use tokio_postgres::types::ToSql;
use tracing::debug;

use super::pg_tls::{self, PgConnectError};
use super::util::{build_insert, describe_pg_error, describe_target, COLUMNS};
use super::{ItemStore, SinkTarget, StorageError, StoreConnector};
use crate::models::ItemRecord;
use crate::secrets::DbSecret;

/// PostgreSQL caps bind parameters per statement at 65535.
const MAX_ROWS_PER_STATEMENT: usize = u16::MAX as usize / COLUMNS.len();

/// Opens one connection per run from a resolved secret.
#[derive(Debug, Default, Clone, Copy)]
pub struct PgConnector;

#[async_trait]
impl StoreConnector for PgConnector {
    async fn connect(
        &self,
        secret: &DbSecret,
        target: &SinkTarget,
    ) -> Result<Box<dyn ItemStore>, StorageError> {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&secret.host)
            .port(secret.port)
            .user(&secret.username)
            .password(&secret.password)
            .dbname(&target.database)
            .application_name("wishtrack")
            // Naive UTC timestamps land unshifted in timestamptz columns.
            .options("-c TimeZone=UTC");

        let described = describe_target(secret, &target.database);
        debug!("Connecting to {} (tls={})", described, !target.no_tls);

        let client = pg_tls::connect(&config, target.no_tls)
            .await
            .map_err(|e| StorageError::Connect {
                target: described,
                message: match &e {
                    PgConnectError::Postgres(pg) => describe_pg_error(pg),
                    PgConnectError::Tls(_) => e.to_string(),
                },
            })?;

        Ok(Box::new(PgStore { client }))
    }
}

/// One open connection.
pub struct PgStore {
    client: tokio_postgres::Client,
}

/// Bind values for one row, in column order.
struct RowParams<'a> {
    timestamp: NaiveDateTime,
    list: &'a str,
    num: i32,
    item: &'a str,
    item_name: &'a str,
    price: Option<f64>,
    requested: i32,
    purchased: i32,
    fulfilled: &'static str,
}

impl<'a> RowParams<'a> {
    fn new(record: &'a ItemRecord, table: &str) -> Result<Self, StorageError> {
        let int = |value: u32, column: &str| {
            i32::try_from(value).map_err(|_| StorageError::Insert {
                table: table.to_string(),
                message: format!("{} value {} does not fit INTEGER", column, value),
            })
        };

        Ok(Self {
            timestamp: record.timestamp.naive_utc().trunc_subsecs(0),
            list: &record.list_name,
            num: int(record.rank, "num")?,
            item: &record.item_id,
            item_name: &record.item_name,
            price: record.price.amount(),
            requested: int(record.requested, "requested")?,
            purchased: int(record.purchased, "purchased")?,
            fulfilled: record.fulfilled_label(),
        })
    }

    fn push_into<'p>(&'p self, params: &mut Vec<&'p (dyn ToSql + Sync)>) {
        params.push(&self.timestamp);
        params.push(&self.list);
        params.push(&self.num);
        params.push(&self.item);
        params.push(&self.item_name);
        params.push(&self.price);
        params.push(&self.requested);
        params.push(&self.purchased);
        params.push(&self.fulfilled);
    }
}

#[async_trait]
impl ItemStore for PgStore {
    async fn insert_all(
        &mut self,
        table: &str,
        records: &[ItemRecord],
        batch_size: usize,
    ) -> Result<usize, StorageError> {
        let insert_error = |e: tokio_postgres::Error| StorageError::Insert {
            table: table.to_string(),
            message: describe_pg_error(&e),
        };

        let rows = records
            .iter()
            .map(|r| RowParams::new(r, table))
            .collect::<Result<Vec<_>, _>>()?;

        let batch_size = batch_size.clamp(1, MAX_ROWS_PER_STATEMENT);
        let tx = self.client.transaction().await.map_err(insert_error)?;

        let mut count = 0;
        for chunk in rows.chunks(batch_size) {
            let sql = build_insert(table, chunk.len());
            let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(chunk.len() * COLUMNS.len());
            for row in chunk {
                row.push_into(&mut params);
            }

            count += tx.execute(sql.as_str(), &params).await.map_err(insert_error)? as usize;
            debug!("Inserted {} of {} rows into {}", count, rows.len(), table);
        }

        // Dropping an uncommitted transaction rolls it back.
        tx.commit().await.map_err(insert_error)?;
        Ok(count)
    }
}
