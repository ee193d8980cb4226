// src/db.rs

use std::str::FromStr;
use std::time::Duration;

use sqlx::{
    SqlitePool,
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};

/// Embedded migrations, shared by the binary and the integration tests.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Opens the attempt-store pool.
///
/// WAL plus a busy timeout so concurrent submit statements queue on the
/// single writer instead of failing; the conditional-write statements in
/// the lifecycle manager rely on each statement executing atomically.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}
