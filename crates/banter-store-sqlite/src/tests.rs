//! Integration tests for `SqliteStore` against an in-memory database.

use banter_core::{
  comment::{NewComment, NewContent, SaveOutcome},
  like::LikeOutcome,
  store::{CommentStore, PageRequest},
  subject::SubjectIdentity,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_comment(
  id: u64,
  subject: SubjectIdentity,
  member_id: u64,
  root: u64,
  parent: u64,
  message: &str,
) -> NewComment {
  NewComment {
    id,
    subject,
    subject_owner_id: 1,
    member_id,
    root,
    parent,
    content: NewContent { message: message.into(), ..Default::default() },
  }
}

async fn save(s: &SqliteStore, input: NewComment) -> banter_core::comment::Comment {
  s.save_comment(input)
    .await
    .unwrap()
    .created()
    .expect("freshly created comment")
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn schema_creates_every_table() {
  let s = store().await;
  assert!(s.get_comment(1).await.unwrap().is_none());
  assert!(s.subjects_by_objects(vec![1], 1).await.unwrap().is_empty());
  assert!(s.liked_comments(1, vec![1]).await.unwrap().is_empty());
}

// ─── Subjects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_or_create_subject_starts_with_zeroed_counters() {
  let s = store().await;
  let identity = SubjectIdentity::new(7, 1);

  let subject = s.get_or_create_subject(identity, 42).await.unwrap();
  assert_eq!(subject.obj_id, 7);
  assert_eq!(subject.obj_type, 1);
  assert_eq!(subject.member_id, 42);
  assert_eq!(subject.comment_count, 0);
  assert_eq!(subject.root_count, 0);
  assert_eq!(subject.all_count, 0);
}

#[tokio::test]
async fn get_or_create_subject_is_idempotent() {
  let s = store().await;
  let identity = SubjectIdentity::new(7, 1);

  let first = s.get_or_create_subject(identity, 42).await.unwrap();
  let second = s.get_or_create_subject(identity, 99).await.unwrap();

  // The second call returns the winner's row, owner included.
  assert_eq!(first.id, second.id);
  assert_eq!(second.member_id, 42);
}

#[tokio::test]
async fn concurrent_get_or_create_yields_one_subject() {
  let s = store().await;
  let identity = SubjectIdentity::new(9, 2);

  let (a, b) = tokio::join!(
    s.get_or_create_subject(identity, 5),
    s.get_or_create_subject(identity, 6),
  );
  assert_eq!(a.unwrap().id, b.unwrap().id);

  let rows = s.subjects_by_objects(vec![9], 2).await.unwrap();
  assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn subjects_by_objects_filters_by_type() {
  let s = store().await;
  s.get_or_create_subject(SubjectIdentity::new(1, 1), 0).await.unwrap();
  s.get_or_create_subject(SubjectIdentity::new(2, 1), 0).await.unwrap();
  s.get_or_create_subject(SubjectIdentity::new(2, 2), 0).await.unwrap();

  let rows = s.subjects_by_objects(vec![1, 2, 3], 1).await.unwrap();
  assert_eq!(rows.len(), 2);
  assert!(rows.iter().all(|sbj| sbj.obj_type == 1));
}

// ─── Comment writer ──────────────────────────────────────────────────────────

#[tokio::test]
async fn root_floors_are_gapless_and_sequential() {
  let s = store().await;
  let identity = SubjectIdentity::new(1, 1);

  let mut floors = Vec::new();
  for id in 1..=5u64 {
    let c = save(&s, new_comment(100 + id, identity, id, 0, 0, "hello")).await;
    floors.push(c.floor);
  }
  assert_eq!(floors, vec![1, 2, 3, 4, 5]);

  let subject = s.get_or_create_subject(identity, 0).await.unwrap();
  assert_eq!(subject.root_count, 5);
  assert_eq!(subject.all_count, 5);
}

#[tokio::test]
async fn reply_floors_are_scoped_to_their_root() {
  let s = store().await;
  let identity = SubjectIdentity::new(1, 1);

  let root1 = save(&s, new_comment(101, identity, 1, 0, 0, "first")).await;
  let root2 = save(&s, new_comment(102, identity, 2, 0, 0, "second")).await;
  assert_eq!(root1.floor, 1);
  assert_eq!(root2.floor, 2);

  let reply1 =
    save(&s, new_comment(201, identity, 3, root1.id, root1.id, "re")).await;
  let reply2 =
    save(&s, new_comment(202, identity, 4, root1.id, reply1.id, "re re")).await;
  assert_eq!(reply1.floor, 1);
  assert_eq!(reply2.floor, 2);

  // Root counters observed the two replies; subject counted everything.
  let root1 = s.get_comment(root1.id).await.unwrap().unwrap();
  assert_eq!(root1.reply_count, 2);
  assert_eq!(root1.root_reply_count, 2);

  let subject = s.get_or_create_subject(identity, 0).await.unwrap();
  assert_eq!(subject.root_count, 2);
  assert_eq!(subject.all_count, 4);
}

#[tokio::test]
async fn reply_to_missing_root_errors() {
  let s = store().await;
  let identity = SubjectIdentity::new(1, 1);

  let err = s
    .save_comment(new_comment(101, identity, 1, 999, 999, "orphan"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(banter_core::Error::RootCommentNotFound(999))
  ));

  // The failed transaction left no trace on the subject.
  let subject = s.get_or_create_subject(identity, 0).await.unwrap();
  assert_eq!(subject.all_count, 0);
}

#[tokio::test]
async fn saving_the_same_id_twice_is_already_applied() {
  let s = store().await;
  let identity = SubjectIdentity::new(1, 1);
  let input = new_comment(101, identity, 1, 0, 0, "once");

  let first = s.save_comment(input.clone()).await.unwrap();
  assert!(matches!(first, SaveOutcome::Created(_)));

  let second = s.save_comment(input).await.unwrap();
  assert!(matches!(second, SaveOutcome::AlreadyApplied { id: 101 }));

  let subject = s.get_or_create_subject(identity, 0).await.unwrap();
  assert_eq!(subject.all_count, 1);
  assert_eq!(subject.root_count, 1);
}

#[tokio::test]
async fn content_round_trips() {
  let s = store().await;
  let identity = SubjectIdentity::new(3, 1);

  let mut input = new_comment(101, identity, 1, 0, 0, "with content");
  input.content = NewContent {
    at_member_ids: vec![8, 9],
    ip: "198.51.100.7".into(),
    platform: 2,
    device: "pixel-9".into(),
    message: "with content".into(),
    meta: "{\"pinned\":true}".into(),
  };
  save(&s, input).await;

  let fetched = s.get_comment(101).await.unwrap().unwrap();
  assert_eq!(fetched.at_member_ids, vec![8, 9]);
  assert_eq!(fetched.ip, "198.51.100.7");
  assert_eq!(fetched.platform, 2);
  assert_eq!(fetched.device, "pixel-9");
  assert_eq!(fetched.message, "with content");
  assert_eq!(fetched.meta, "{\"pinned\":true}");
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn comment_page_is_floor_descending_and_paginated() {
  let s = store().await;
  let identity = SubjectIdentity::new(4, 1);
  for id in 1..=5u64 {
    save(&s, new_comment(100 + id, identity, id, 0, 0, "root")).await;
  }

  let page1 = s.comment_page(identity, PageRequest::new(1, 2)).await.unwrap();
  let page2 = s.comment_page(identity, PageRequest::new(2, 2)).await.unwrap();
  let page3 = s.comment_page(identity, PageRequest::new(3, 2)).await.unwrap();

  let floors = |page: &[banter_core::comment::Comment]| {
    page.iter().map(|c| c.floor).collect::<Vec<_>>()
  };
  assert_eq!(floors(&page1), vec![5, 4]);
  assert_eq!(floors(&page2), vec![3, 2]);
  assert_eq!(floors(&page3), vec![1]);
}

#[tokio::test]
async fn comment_page_excludes_replies() {
  let s = store().await;
  let identity = SubjectIdentity::new(4, 1);
  let root = save(&s, new_comment(101, identity, 1, 0, 0, "root")).await;
  save(&s, new_comment(201, identity, 2, root.id, root.id, "reply")).await;

  let page = s.comment_page(identity, PageRequest::new(1, 10)).await.unwrap();
  assert_eq!(page.len(), 1);
  assert_eq!(page[0].id, root.id);
}

#[tokio::test]
async fn reply_previews_respect_depth_and_resolve_parents() {
  let s = store().await;
  let identity = SubjectIdentity::new(4, 1);
  let root = save(&s, new_comment(101, identity, 10, 0, 0, "root")).await;
  let r1 =
    save(&s, new_comment(201, identity, 11, root.id, root.id, "r1")).await;
  save(&s, new_comment(202, identity, 12, root.id, r1.id, "r2")).await;
  save(&s, new_comment(203, identity, 13, root.id, root.id, "r3")).await;

  let previews = s.reply_previews(vec![root.id], 2).await.unwrap();
  assert_eq!(previews.len(), 2);
  // Oldest floors first.
  assert_eq!(previews[0].floor, 1);
  assert_eq!(previews[1].floor, 2);
  // r1's parent is the root; r2's parent is r1.
  assert_eq!(previews[0].parent_member_id, 10);
  assert_eq!(previews[1].parent_member_id, 11);
}

#[tokio::test]
async fn reply_page_is_floor_descending_with_parent_authors() {
  let s = store().await;
  let identity = SubjectIdentity::new(4, 1);
  let root = save(&s, new_comment(101, identity, 10, 0, 0, "root")).await;
  let r1 =
    save(&s, new_comment(201, identity, 11, root.id, root.id, "r1")).await;
  save(&s, new_comment(202, identity, 12, root.id, r1.id, "r2")).await;

  let page = s.reply_page(root.id, PageRequest::new(1, 10)).await.unwrap();
  assert_eq!(page.len(), 2);
  assert_eq!(page[0].floor, 2);
  assert_eq!(page[0].parent_member_id, 11);
  assert_eq!(page[1].floor, 1);
  assert_eq!(page[1].parent_member_id, 10);
}

#[tokio::test]
async fn get_comment_missing_returns_none() {
  let s = store().await;
  assert!(s.get_comment(424242).await.unwrap().is_none());
}

// ─── Like ledger ─────────────────────────────────────────────────────────────

async fn store_with_comment() -> (SqliteStore, u64) {
  let s = store().await;
  let identity = SubjectIdentity::new(5, 1);
  let c = save(&s, new_comment(100, identity, 1, 0, 0, "likeable")).await;
  (s, c.id)
}

#[tokio::test]
async fn re_like_is_idempotent() {
  let (s, id) = store_with_comment().await;

  let first = s.apply_like(id, 5, 1).await.unwrap();
  assert_eq!(first, LikeOutcome::Applied { like_count: 1 });

  let second = s.apply_like(id, 5, 1).await.unwrap();
  assert_eq!(second, LikeOutcome::Noop);

  let c = s.get_comment(id).await.unwrap().unwrap();
  assert_eq!(c.like_count, 1);

  let liked = s.liked_comments(5, vec![id]).await.unwrap();
  assert_eq!(liked.len(), 1);
}

#[tokio::test]
async fn unlike_without_record_is_noop() {
  let (s, id) = store_with_comment().await;

  let outcome = s.apply_like(id, 5, -1).await.unwrap();
  assert_eq!(outcome, LikeOutcome::Noop);

  let c = s.get_comment(id).await.unwrap().unwrap();
  assert_eq!(c.like_count, 0);
  assert!(s.liked_comments(5, vec![id]).await.unwrap().is_empty());
}

#[tokio::test]
async fn like_then_unlike_returns_to_zero() {
  let (s, id) = store_with_comment().await;

  s.apply_like(id, 5, 1).await.unwrap();
  let outcome = s.apply_like(id, 5, -1).await.unwrap();
  assert_eq!(outcome, LikeOutcome::Applied { like_count: 0 });

  assert!(s.liked_comments(5, vec![id]).await.unwrap().is_empty());
}

#[tokio::test]
async fn out_of_range_deltas_clamp() {
  let (s, id) = store_with_comment().await;

  assert_eq!(
    s.apply_like(id, 5, 100).await.unwrap(),
    LikeOutcome::Applied { like_count: 1 }
  );
  assert_eq!(
    s.apply_like(id, 5, -100).await.unwrap(),
    LikeOutcome::Applied { like_count: 0 }
  );
}

#[tokio::test]
async fn zero_delta_is_noop() {
  let (s, id) = store_with_comment().await;
  assert_eq!(s.apply_like(id, 5, 0).await.unwrap(), LikeOutcome::Noop);
}

#[tokio::test]
async fn like_on_missing_comment_errors() {
  let s = store().await;
  let err = s.apply_like(424242, 5, 1).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(banter_core::Error::CommentNotFound(424242))
  ));
}

#[tokio::test]
async fn liked_comments_returns_only_liked_ids() {
  let s = store().await;
  let identity = SubjectIdentity::new(5, 1);
  let a = save(&s, new_comment(100, identity, 1, 0, 0, "a")).await;
  let b = save(&s, new_comment(101, identity, 1, 0, 0, "b")).await;

  s.apply_like(a.id, 5, 1).await.unwrap();

  let liked = s.liked_comments(5, vec![a.id, b.id]).await.unwrap();
  assert_eq!(liked.len(), 1);
  assert_eq!(liked[0].comment_id, a.id);
  assert!(liked[0].liked);
}

#[tokio::test]
async fn hate_counter_applies_blind() {
  let (s, id) = store_with_comment().await;

  s.apply_hate(id, 1).await.unwrap();
  s.apply_hate(id, 1).await.unwrap();

  let c = s.get_comment(id).await.unwrap().unwrap();
  assert_eq!(c.hate_count, 2);
}
