//! Core types and trait definitions for the sitrep reporting engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod catalog;
pub mod declaration;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod period;
pub mod principal;
pub mod report;
pub mod scope;
pub mod situation;
pub mod store;
pub mod structure;
pub mod user;

pub use error::{Error, Result};
