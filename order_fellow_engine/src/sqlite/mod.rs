//! SQLite backend for the Order Fellow engine.
//!
//! The schema lives in `migrations/` and is embedded into the binary. Call [`SqliteDatabase::run_migrations`] at
//! startup.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
