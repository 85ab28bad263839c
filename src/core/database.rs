//! Database - Connection pool e migrations incorporate nel binario

use crate::core::config::Config;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Apre il pool descritto dalla configurazione e aggiorna lo schema
pub async fn connect(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    info!("Database connected and migrations applied");
    Ok(pool)
}
