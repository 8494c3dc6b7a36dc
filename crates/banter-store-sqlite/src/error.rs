//! Error type for `banter-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] banter_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl Error {
  /// Convenience constructor for the comment-not-found case.
  pub fn comment_not_found(id: u64) -> Self {
    Error::Core(banter_core::Error::CommentNotFound(id))
  }

  /// Convenience constructor for a missing root comment during reply
  /// creation.
  pub fn root_not_found(id: u64) -> Self {
    Error::Core(banter_core::Error::RootCommentNotFound(id))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
