//! SQLite backend for Aquifer
//!
//! Implements the [`aquifer_core::DataAdapter`] contract over rusqlite,
//! including the bookkeeping-table migration scheme (`migrations`) and the
//! persistent identity counter (`increment_id`).

mod adapter;
mod schema;

pub use adapter::SqliteAdapter;
