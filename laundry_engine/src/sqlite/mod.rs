//! SQLite backend for the laundry engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
