use std::{str::FromStr, time::Duration};

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tracing::{info, warn};

use crate::config::AppConfig;

/// Connect options carrying the per-statement timeout, so a stuck query
/// cancels itself and the surrounding transaction rolls back.
pub fn connect_options(config: &AppConfig) -> anyhow::Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(&config.database_url)
        .context("parse DATABASE_URL")?
        .options([(
            "statement_timeout",
            config.db.statement_timeout_ms.to_string(),
        )]);
    Ok(options)
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(config.db.max_connections)
        .acquire_timeout(Duration::from_secs(config.db.acquire_timeout_secs))
        .connect_with(connect_options(config)?)
        .await
        .context("connect to database")?;
    info!(max_connections = config.db.max_connections, "database pool ready");
    Ok(db)
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    if let Err(e) = sqlx::migrate!("./migrations").run(db).await {
        warn!(error = %e, "migration failed");
        return Err(e).context("run migrations");
    }
    info!("migrations applied");
    Ok(())
}
