//! Storage bootstrap for the Line Trace platform
//!
//! Schema setup is an explicit startup step, never a side effect of service
//! construction: `initialize` builds the pool and brings the schema up to
//! date before anything else touches the database.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::DatabaseConfig;
use crate::error::AppResult;

pub mod migrations;
pub mod seed;

/// Open the SQLite pool and run pending migrations
pub async fn initialize(config: &DatabaseConfig) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    migrations::run(&pool).await?;

    Ok(pool)
}
