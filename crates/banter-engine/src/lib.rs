//! Write pipeline, index cache, and service facade for the Banter comment
//! engine.
//!
//! Comment creation is not applied synchronously: [`Comments::create`]
//! mints the id, publishes a save message, and returns the id immediately.
//! A [`pipeline::SaveWorker`] drains the queue and applies each message
//! through the store, so there is an explicit eventual-consistency window
//! between "id returned" and "comment visible in listings".
//!
//! Reads go through the per-subject index cache first and fall back to the
//! store on miss, enqueueing a cache rebuild for the missed page.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
#![allow(async_fn_in_trait)]

pub mod cache;
pub mod config;
pub mod error;
pub mod messages;
pub mod pipeline;
pub mod queue;
pub mod service;

pub use cache::{IndexCache, MemoryIndexCache};
pub use config::EngineConfig;
pub use error::EngineError;
pub use queue::{InMemoryBroker, Queue};
pub use service::Comments;
