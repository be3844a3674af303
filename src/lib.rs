use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    SqlitePool,
};

pub mod auth;
pub mod db;
pub mod errors;
pub mod models;
pub mod routes;
pub mod utils;
pub mod workflow;

/// Embedded migrations, also run by the integration tests.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[derive(Debug, Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
}

pub async fn init_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .read_only(false)
        .busy_timeout(std::time::Duration::from_secs(5));

    SqlitePool::connect_with(opts).await
}
