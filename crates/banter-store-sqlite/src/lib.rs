//! SQLite backend for the Banter comment store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. That single connection is
//! also the serialization point: counter increment plus post-increment
//! re-read execute inside one immediate transaction, so floors stay
//! gapless under concurrent writers.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
