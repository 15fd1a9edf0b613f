use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use bookline_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Opens the session-store pool with this workload's pragmas: WAL so reads
/// keep flowing while a turn is being written, foreign keys for the
/// per-user result rows, and a configurable busy timeout bounding how long
/// a write waits on the single SQLite writer.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(
        &config.url,
        config.max_connections,
        config.timeout_secs,
        config.busy_timeout_ms,
    )
    .await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
    busy_timeout_ms: u64,
) -> Result<DbPool, sqlx::Error> {
    let busy_timeout_ms = busy_timeout_ms.max(1);
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query(&format!("PRAGMA busy_timeout = {busy_timeout_ms}"))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}
