//! SQLite backend for the sitrep situation store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. The atomic lifecycle transitions
//! (`confirm`, `reject`, `delete`) run as explicit transactions inside a
//! single connection call.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
