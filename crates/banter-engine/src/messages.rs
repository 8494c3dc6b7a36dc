//! Wire types for the write pipeline, serialized as JSON.

use banter_core::{
  comment::NewComment,
  store::PageRequest,
  subject::SubjectIdentity,
};
use serde::{Deserialize, Serialize};

/// Topic carrying comment creation requests.
pub const TOPIC_COMMENT_SAVE: &str = "comment.save";

/// Topic carrying index-cache rebuild requests.
pub const TOPIC_CACHE_REBUILD: &str = "comment.cache-rebuild";

/// Dead-letter topic for messages that exhausted their retries.
pub fn dead_topic(topic: &str) -> String { format!("{topic}.dead") }

/// A comment creation request travelling through the queue. The comment id
/// inside is pre-assigned by the producer and doubles as the idempotency
/// key under redelivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveCommentMessage {
  pub comment: NewComment,
}

/// A request to rebuild one page window of a subject's index cache.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheRebuildMessage {
  pub obj_id:   u64,
  pub obj_type: i32,
  pub page:     i64,
  pub size:     i64,
}

impl CacheRebuildMessage {
  pub fn new(identity: SubjectIdentity, page: PageRequest) -> Self {
    Self {
      obj_id:   identity.obj_id,
      obj_type: identity.obj_type,
      page:     page.page,
      size:     page.size,
    }
  }

  pub fn identity(&self) -> SubjectIdentity {
    SubjectIdentity::new(self.obj_id, self.obj_type)
  }

  pub fn page_request(&self) -> PageRequest {
    PageRequest::new(self.page, self.size)
  }
}
