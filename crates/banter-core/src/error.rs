//! Error types for `banter-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("comment not found: {0}")]
  CommentNotFound(u64),

  #[error("root comment not found: {0}")]
  RootCommentNotFound(u64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
