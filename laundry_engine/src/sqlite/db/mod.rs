//! # SQLite storage functions
//!
//! Plain functions that take a `&mut SqliteConnection`. Callers get a connection from the pool, or open a
//! transaction and pass `&mut tx` through, so the same function works inside and outside an atomic unit of work.
use std::str::FromStr;

use log::info;
use lms_common::helpers::env_or_default;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod catalog;
pub mod clients;
pub mod mpesa;
pub mod orders;
pub mod payments;
pub mod sms;

const SQLITE_DB_URL: &str = "sqlite://data/laundry.db";

/// Largest number of bound parameters used in a single `IN (...)` clause.
pub(crate) const MAX_IN_CLAUSE: usize = 500;

pub fn db_url() -> String {
    let result = env_or_default("LMS_DATABASE_URL", SQLITE_DB_URL.to_string());
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true).foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
