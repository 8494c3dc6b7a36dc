//! Comment records: the index row, its content payload, and the joined
//! read model.
//!
//! The tree shape (root/parent) is stored as flat rows with id
//! back-references, never as an owning object graph — replies must be
//! independently queryable and paginated. `root == 0` marks a comment that
//! is itself a thread root; `parent == 0` means "no parent".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subject::SubjectIdentity;

/// Sentinel id meaning "none" for `root` and `parent` references.
pub const NO_REF: u64 = 0;

/// Content payload split from the index row so the two can live on
/// different storage tiers. 1:1 with the index row, same id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContent {
  /// Members mentioned ("@-ed") in the message.
  pub at_member_ids: Vec<u64>,
  pub ip:       String,
  pub platform: i8,
  pub device:   String,
  pub message:  String,
  /// Free-form metadata, opaque to the engine.
  pub meta:     String,
}

/// A fully-specified comment creation request with a pre-assigned id.
///
/// The id is minted by the producer before the request enters the write
/// pipeline; it doubles as the idempotency key when a queue message is
/// redelivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
  pub id:        u64,
  pub subject:   SubjectIdentity,
  /// Owner of the commented-on object, used if the subject must be created.
  pub subject_owner_id: u64,
  /// Verified author of the comment; opaque to the engine.
  pub member_id: u64,
  /// Root comment id, or [`NO_REF`] if this comment starts a thread.
  pub root:      u64,
  /// Parent comment id, or [`NO_REF`]. The parent may be the root itself
  /// or another reply under the same root.
  pub parent:    u64,
  pub content:   NewContent,
}

impl NewComment {
  pub fn is_root(&self) -> bool { self.root == NO_REF }
}

/// The joined read model: index row plus content, with the parent author
/// resolved where the caller asked for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
  pub id:         u64,
  pub subject_id: u64,
  pub obj_id:     u64,
  pub obj_type:   i32,
  pub member_id:  u64,
  pub root:       u64,
  pub parent:     u64,
  /// Author of the parent comment, or 0 when unresolved/absent.
  pub parent_member_id: u64,
  /// 1-based sequence number within the numbering scope: the subject for
  /// roots, the root comment for replies.
  pub floor:      i64,
  pub reply_count:      i64,
  /// Reply floor counter; the floor assigned to the newest reply.
  pub root_reply_count: i64,
  pub like_count: i64,
  pub hate_count: i64,
  pub state:      i8,
  pub at_member_ids: Vec<u64>,
  pub ip:       String,
  pub platform: i8,
  pub device:   String,
  pub message:  String,
  pub meta:     String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  /// Reply previews attached on listing; empty otherwise.
  #[serde(default)]
  pub replies: Vec<Comment>,
}

impl Comment {
  pub fn is_root(&self) -> bool { self.root == NO_REF }

  pub fn identity(&self) -> SubjectIdentity {
    SubjectIdentity::new(self.obj_id, self.obj_type)
  }
}

/// Typed counter mutation applied to a root comment's index row when a
/// reply is created under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootCounterDelta {
  pub replies:      i64,
  pub root_replies: i64,
}

impl RootCounterDelta {
  pub fn for_new_reply() -> Self { Self { replies: 1, root_replies: 1 } }
}

/// Outcome of a comment save: either a freshly committed comment, or the
/// detection that this id was already applied (queue redelivery).
#[derive(Debug, Clone)]
pub enum SaveOutcome {
  Created(Comment),
  AlreadyApplied { id: u64 },
}

impl SaveOutcome {
  pub fn created(self) -> Option<Comment> {
    match self {
      SaveOutcome::Created(c) => Some(c),
      SaveOutcome::AlreadyApplied { .. } => None,
    }
  }
}
