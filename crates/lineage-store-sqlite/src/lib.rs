//! SQLite backend for Lineage.
//!
//! [`SqliteStore`] implements [`lineage_core::store::FamilyStore`] over one
//! database file. Queries run on `tokio_rusqlite`'s background thread, and
//! every multi-row write is a single transaction.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
