//! Engine error type.
//!
//! Cache failures never appear here: the read path degrades to the store
//! and logs, per the consistency contract.

use thiserror::Error;

use crate::queue::QueueError;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("queue error: {0}")]
  Queue(#[from] QueueError),

  #[error("serialization error: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    EngineError::Store(Box::new(e))
  }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
