//! The `CommentStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `banter-store-sqlite`).
//! Higher layers (`banter-engine`) depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  comment::{Comment, NewComment, SaveOutcome},
  like::{LikeItem, LikeOutcome},
  subject::{Subject, SubjectIdentity},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// 1-based page request with a page size; pages below 1 clamp to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page: i64,
  pub size: i64,
}

impl PageRequest {
  pub fn new(page: i64, size: i64) -> Self { Self { page, size } }

  /// Row offset of the first entry on this page.
  pub fn offset(&self) -> i64 { (self.page.max(1) - 1) * self.size.max(0) }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a comment store backend.
///
/// `save_comment` and `apply_like` are the invariant-bearing operations:
/// implementations must execute each as one atomic unit, with counter
/// increments and the post-increment re-read linearized per subject (or per
/// root comment, or per (member, comment) pair for likes).
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait CommentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Resolve the subject for `identity`, creating it with zeroed counters
  /// if absent. Never creates two subjects for one identity, even under
  /// concurrent callers: a lost creation race is recovered by re-query,
  /// not surfaced.
  fn get_or_create_subject(
    &self,
    identity: SubjectIdentity,
    owner_member_id: u64,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// Batch lookup of subjects by external object ids of one type. Missing
  /// objects are simply absent from the result.
  fn subjects_by_objects(
    &self,
    obj_ids: Vec<u64>,
    obj_type: i32,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  // ── Comment writer ────────────────────────────────────────────────────

  /// Apply a comment creation transactionally: resolve/create the subject,
  /// bump its counters, assign the floor from the post-increment counter
  /// (subject `root_count` for roots, the root's `root_reply_count` for
  /// replies), and persist index + content under the pre-assigned id.
  ///
  /// Re-applying an id that already has an index row is a clean no-op
  /// ([`SaveOutcome::AlreadyApplied`]); queue redelivery relies on this.
  fn save_comment(
    &self,
    new: NewComment,
  ) -> impl Future<Output = Result<SaveOutcome, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Single comment, index joined with content. `None` if absent.
  fn get_comment(
    &self,
    id: u64,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  /// One page of root comments under a subject, floor descending (newest
  /// thread first), content joined. No reply previews are attached here.
  fn comment_page(
    &self,
    identity: SubjectIdentity,
    page: PageRequest,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Replies previewed under a page of roots: every reply with `root` in
  /// `root_ids` and reply floor at most `depth`, floor ascending, with
  /// each reply's parent author resolved.
  fn reply_previews(
    &self,
    root_ids: Vec<u64>,
    depth: i64,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// One page of replies under a single root, floor descending, parent
  /// authors resolved.
  fn reply_page(
    &self,
    root_id: u64,
    page: PageRequest,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  // ── Like ledger ───────────────────────────────────────────────────────

  /// Apply a like/unlike delta for a (member, comment) pair, transactionally
  /// against the ledger record. The raw delta is normalized to {-1, 0, +1};
  /// re-like and re-unlike are idempotent no-ops, so `like_count` can never
  /// go negative or double-count one member.
  fn apply_like(
    &self,
    comment_id: u64,
    member_id: u64,
    delta: i32,
  ) -> impl Future<Output = Result<LikeOutcome, Self::Error>> + Send + '_;

  /// Blind hate-counter delta on the index row. No ledger backs this
  /// counter.
  fn apply_hate(
    &self,
    comment_id: u64,
    delta: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Which of `comment_ids` has `member_id` liked. Only liked ids are
  /// returned.
  fn liked_comments(
    &self,
    member_id: u64,
    comment_ids: Vec<u64>,
  ) -> impl Future<Output = Result<Vec<LikeItem>, Self::Error>> + Send + '_;
}
