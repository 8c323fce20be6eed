//! Repository utilities.

use std::error::Error;

use crate::secrets::DbSecret;

/// Column order of the history table.
pub const COLUMNS: [&str; 9] = [
    "timestamp",
    "list",
    "num",
    "item",
    "item_name",
    "price",
    "requested",
    "purchased",
    "fulfilled",
];

/// Quote a name as one SQL identifier: `my "table"` becomes `"my ""table"""`.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Wire type of each bound column, in `COLUMNS` order. Placeholders are cast
/// to these so Postgres converts them to whatever the table declares
/// (`numeric` prices, `timestamptz` timestamps, ...) on assignment.
pub const BIND_TYPES: [&str; 9] = [
    "timestamp",
    "text",
    "int4",
    "text",
    "text",
    "float8",
    "int4",
    "int4",
    "text",
];

/// Build a multi-row INSERT with typed `$n::type` placeholders for `rows` rows.
pub fn build_insert(table: &str, rows: usize) -> String {
    let columns = COLUMNS
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!("INSERT INTO {} ({}) VALUES ", quote_ident(table), columns);
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for (col, bind_type) in BIND_TYPES.iter().enumerate() {
            if col > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!("${}::{}", row * COLUMNS.len() + col + 1, bind_type));
        }
        sql.push(')');
    }
    sql
}

/// `user@host:port/database`, for logs and error messages. Never includes the password.
pub fn describe_target(secret: &DbSecret, database: &str) -> String {
    format!(
        "{}@{}:{}/{}",
        secret.username, secret.host, secret.port, database
    )
}

/// Extract the real message from a tokio-postgres error.
///
/// tokio_postgres::Error's Display impl just shows "db error" for database errors,
/// so we need to dig into the source to get the actual message.
pub fn describe_pg_error(e: &tokio_postgres::Error) -> String {
    if let Some(db_err) = e.as_db_error() {
        format!(
            "{}: {}{}{}",
            db_err.severity(),
            db_err.message(),
            db_err
                .detail()
                .map(|d| format!(" DETAIL: {}", d))
                .unwrap_or_default(),
            db_err
                .hint()
                .map(|h| format!(" HINT: {}", h))
                .unwrap_or_default(),
        )
    } else {
        // Fall back to source chain for non-db errors
        let mut msg = e.to_string();
        let mut source = e.source();
        while let Some(src) = source {
            msg = format!("{}: {}", msg, src);
            source = src.source();
        }
        msg
    }
}
