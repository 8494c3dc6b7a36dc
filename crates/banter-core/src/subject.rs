//! Subject — the entity a comment thread hangs off (an article, a post).
//!
//! A subject is created lazily on first comment and carries the counters
//! that drive floor assignment for root comments. Identity is the pair
//! (external object id, object type); at most one subject per identity
//! ever exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The identity of a subject: which external object it is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectIdentity {
  /// Id of the external object (article, post, ...) in its own system.
  pub obj_id:   u64,
  /// Discriminator for the kind of external object.
  pub obj_type: i32,
}

impl SubjectIdentity {
  pub fn new(obj_id: u64, obj_type: i32) -> Self { Self { obj_id, obj_type } }
}

/// A comment subject with its counters, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
  pub id:         u64,
  pub obj_id:     u64,
  pub obj_type:   i32,
  /// Member who owns the commented-on object, recorded at creation.
  pub member_id:  u64,
  pub comment_count: i64,
  /// Number of root comments; also the floor counter for new roots.
  pub root_count: i64,
  /// Total comments under this subject, roots and replies.
  pub all_count:  i64,
  pub state:      i8,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Subject {
  pub fn identity(&self) -> SubjectIdentity {
    SubjectIdentity::new(self.obj_id, self.obj_type)
  }
}

/// Typed counter mutation applied to a subject row inside the comment-save
/// transaction. Replaces ad-hoc "increment this named field" updates so the
/// contract stays statically checkable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectCounterDelta {
  pub comments: i64,
  pub roots:    i64,
  pub all:      i64,
}

impl SubjectCounterDelta {
  /// The delta a freshly created comment applies to its subject:
  /// `comment_count` and `all_count` always move, `root_count` only when
  /// the comment starts a new thread.
  pub fn for_new_comment(is_root: bool) -> Self {
    Self { comments: 1, roots: if is_root { 1 } else { 0 }, all: 1 }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn delta_for_root_comment_bumps_root_count() {
    let d = SubjectCounterDelta::for_new_comment(true);
    assert_eq!(d, SubjectCounterDelta { comments: 1, roots: 1, all: 1 });
  }

  #[test]
  fn delta_for_reply_leaves_root_count_alone() {
    let d = SubjectCounterDelta::for_new_comment(false);
    assert_eq!(d, SubjectCounterDelta { comments: 1, roots: 0, all: 1 });
  }
}
