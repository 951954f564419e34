//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
use std::{env, str::FromStr};

use log::{debug, info};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod accounts;
pub mod credentials;
pub mod history;
pub mod orders;

const SQLITE_DB_URL: &str = "sqlite://data/order_fellow.db";

pub fn db_url() -> String {
    let result = env::var("MOF_DATABASE_URL").unwrap_or_else(|_| {
        info!("MOF_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

/// Opens a connection pool. The database file, and the directory holding it, are created if they do not exist yet.
pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let filename = options.clone().get_filename();
    if let Some(dir) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !dir.exists() {
            debug!("🗃️ Creating database directory {}", dir.display());
            tokio::fs::create_dir_all(dir).await?;
        }
    }
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// Escapes `%`, `_` and the escape character itself so that `value` is matched literally by `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}
