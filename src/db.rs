use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};

use crate::config::AppConfig;

/// Open the pool. Every statement is bounded by `statement_timeout`, and waiting
/// for a free connection by `acquire_timeout`; both come from `DB_TIMEOUT_SECS`.
pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let timeout = Duration::from_secs(config.db_timeout_secs);
    let timeout_ms = timeout.as_millis();

    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(timeout)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                let stmt = format!("SET statement_timeout = {timeout_ms}");
                conn.execute(stmt.as_str()).await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")
}
