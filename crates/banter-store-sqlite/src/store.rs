//! [`SqliteStore`] — the SQLite implementation of [`CommentStore`].

use std::{
  collections::{BTreeSet, HashMap},
  path::Path,
  sync::Arc,
};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use banter_core::{
  comment::{Comment, NewComment, RootCounterDelta, SaveOutcome},
  id::IdGenerator,
  like::{LikeDelta, LikeItem, LikeOutcome},
  store::{CommentStore, PageRequest},
  subject::{Subject, SubjectCounterDelta, SubjectIdentity},
};

use crate::{
  encode::{
    COMMENT_COLS, RawComment, RawSubject, SUBJECT_COLS, decode_id, encode_dt,
    encode_id, encode_members,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Banter comment store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// statements for one operation run on the connection's dedicated thread,
/// and the counter-bearing operations open an immediate transaction there,
/// which is what linearizes increment-then-reread per subject/root row.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  ids:  Arc<IdGenerator>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, ids: Arc::new(IdGenerator::new()) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, ids: Arc::new(IdGenerator::new()) };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── CommentStore impl ───────────────────────────────────────────────────────

impl CommentStore for SqliteStore {
  type Error = Error;

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn get_or_create_subject(
    &self,
    identity: SubjectIdentity,
    owner_member_id: u64,
  ) -> Result<Subject> {
    let ids = self.ids.clone();

    let raw: RawSubject = self
      .conn
      .call(move |conn| {
        Ok((|| {
          let tx =
            conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
          let subject_id =
            get_or_create_subject_tx(&tx, identity, owner_member_id, &ids)?;
          let raw = tx.query_row(
            &format!("SELECT {SUBJECT_COLS} FROM comment_subject WHERE id = ?1"),
            rusqlite::params![encode_id(subject_id)],
            RawSubject::from_row,
          )?;
          tx.commit()?;
          Ok::<_, Error>(raw)
        })())
      })
      .await??;

    raw.into_subject()
  }

  async fn subjects_by_objects(
    &self,
    obj_ids: Vec<u64>,
    obj_type: i32,
  ) -> Result<Vec<Subject>> {
    if obj_ids.is_empty() {
      return Ok(Vec::new());
    }

    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {SUBJECT_COLS} FROM comment_subject
           WHERE obj_type = ? AND obj_id IN ({})",
          placeholders(obj_ids.len()),
        );
        let mut params: Vec<i64> = vec![obj_type as i64];
        params.extend(obj_ids.iter().map(|&id| encode_id(id)));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawSubject::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  // ── Comment writer ────────────────────────────────────────────────────────

  async fn save_comment(&self, new: NewComment) -> Result<SaveOutcome> {
    let ids = self.ids.clone();
    self
      .conn
      .call(move |conn| Ok(save_comment_tx(conn, new, &ids)))
      .await?
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_comment(&self, id: u64) -> Result<Option<Comment>> {
    let id_raw = encode_id(id);

    let raw: Option<RawComment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {COMMENT_COLS} FROM comment_index i
                 JOIN comment_content c ON c.id = i.id
                 WHERE i.id = ?1"
              ),
              rusqlite::params![id_raw],
              RawComment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawComment::into_comment).transpose()
  }

  async fn comment_page(
    &self,
    identity: SubjectIdentity,
    page: PageRequest,
  ) -> Result<Vec<Comment>> {
    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COMMENT_COLS} FROM comment_index i
           JOIN comment_content c ON c.id = i.id
           WHERE i.obj_id = ?1 AND i.obj_type = ?2 AND i.root = 0
           ORDER BY i.floor DESC
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              encode_id(identity.obj_id),
              identity.obj_type,
              page.size,
              page.offset(),
            ],
            RawComment::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }

  async fn reply_previews(
    &self,
    root_ids: Vec<u64>,
    depth: i64,
  ) -> Result<Vec<Comment>> {
    if root_ids.is_empty() || depth <= 0 {
      return Ok(Vec::new());
    }

    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {COMMENT_COLS} FROM comment_index i
           JOIN comment_content c ON c.id = i.id
           WHERE i.root IN ({}) AND i.floor <= ?
           ORDER BY i.floor ASC",
          placeholders(root_ids.len()),
        );
        let mut params: Vec<i64> =
          root_ids.iter().map(|&id| encode_id(id)).collect();
        params.push(depth);

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        resolve_parent_members(conn, &mut rows)?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }

  async fn reply_page(
    &self,
    root_id: u64,
    page: PageRequest,
  ) -> Result<Vec<Comment>> {
    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COMMENT_COLS} FROM comment_index i
           JOIN comment_content c ON c.id = i.id
           WHERE i.root = ?1
           ORDER BY i.floor DESC
           LIMIT ?2 OFFSET ?3"
        ))?;
        let mut rows = stmt
          .query_map(
            rusqlite::params![encode_id(root_id), page.size, page.offset()],
            RawComment::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        resolve_parent_members(conn, &mut rows)?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }

  // ── Like ledger ───────────────────────────────────────────────────────────

  async fn apply_like(
    &self,
    comment_id: u64,
    member_id: u64,
    delta: i32,
  ) -> Result<LikeOutcome> {
    let delta = LikeDelta::normalize(delta);
    if delta == LikeDelta::Noop {
      return Ok(LikeOutcome::Noop);
    }

    self
      .conn
      .call(move |conn| Ok(apply_like_tx(conn, comment_id, member_id, delta)))
      .await?
  }

  async fn apply_hate(&self, comment_id: u64, delta: i64) -> Result<()> {
    // No ledger backs the hate counter; the update is blind.
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE comment_index
           SET hate_count = hate_count + ?1, updated_at = ?2
           WHERE id = ?3",
          rusqlite::params![
            delta,
            encode_dt(Utc::now()),
            encode_id(comment_id)
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn liked_comments(
    &self,
    member_id: u64,
    comment_ids: Vec<u64>,
  ) -> Result<Vec<LikeItem>> {
    if comment_ids.is_empty() {
      return Ok(Vec::new());
    }

    let liked: Vec<i64> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT comment_id FROM comment_like
           WHERE member_id = ? AND comment_id IN ({})",
          placeholders(comment_ids.len()),
        );
        let mut params: Vec<i64> = vec![encode_id(member_id)];
        params.extend(comment_ids.iter().map(|&id| encode_id(id)));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      liked
        .into_iter()
        .map(|id| LikeItem { comment_id: decode_id(id), liked: true })
        .collect(),
    )
  }
}

// ─── Transaction bodies ──────────────────────────────────────────────────────

/// Resolve or conditionally create the subject row for `identity` inside an
/// open transaction; returns its id.
///
/// The insert succeeds only if no row with this identity exists. On zero
/// rows affected a racing writer won; the re-query trusts its row.
fn get_or_create_subject_tx(
  tx: &rusqlite::Transaction<'_>,
  identity: SubjectIdentity,
  owner_member_id: u64,
  ids: &IdGenerator,
) -> Result<u64> {
  let existing: Option<i64> = tx
    .query_row(
      "SELECT id FROM comment_subject WHERE obj_id = ?1 AND obj_type = ?2",
      rusqlite::params![encode_id(identity.obj_id), identity.obj_type],
      |row| row.get(0),
    )
    .optional()?;
  if let Some(id) = existing {
    return Ok(decode_id(id));
  }

  let id = ids.next_id();
  let now = encode_dt(Utc::now());
  let inserted = tx.execute(
    "INSERT INTO comment_subject
       (id, obj_id, obj_type, member_id, comment_count, root_count,
        all_count, state, created_at, updated_at)
     SELECT ?1, ?2, ?3, ?4, 0, 0, 0, 0, ?5, ?5
     WHERE NOT EXISTS (
       SELECT 1 FROM comment_subject WHERE obj_id = ?2 AND obj_type = ?3
     )",
    rusqlite::params![
      encode_id(id),
      encode_id(identity.obj_id),
      identity.obj_type,
      encode_id(owner_member_id),
      now,
    ],
  )?;
  if inserted == 1 {
    return Ok(id);
  }

  // Lost the creation race; the winner's row is authoritative.
  let id: i64 = tx.query_row(
    "SELECT id FROM comment_subject WHERE obj_id = ?1 AND obj_type = ?2",
    rusqlite::params![encode_id(identity.obj_id), identity.obj_type],
    |row| row.get(0),
  )?;
  Ok(decode_id(id))
}

/// The full comment-save transaction: dedup check, subject resolution,
/// counter deltas, post-increment floor read, index + content insert.
fn save_comment_tx(
  conn: &mut rusqlite::Connection,
  new: NewComment,
  ids: &IdGenerator,
) -> Result<SaveOutcome> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let now = Utc::now();
  let now_str = encode_dt(now);

  // The pre-assigned id is the idempotency key: an existing index row
  // means this message was already applied.
  let applied: Option<i64> = tx
    .query_row(
      "SELECT 1 FROM comment_index WHERE id = ?1",
      rusqlite::params![encode_id(new.id)],
      |row| row.get(0),
    )
    .optional()?;
  if applied.is_some() {
    return Ok(SaveOutcome::AlreadyApplied { id: new.id });
  }

  let subject_id =
    get_or_create_subject_tx(&tx, new.subject, new.subject_owner_id, ids)?;

  let delta = SubjectCounterDelta::for_new_comment(new.is_root());
  tx.execute(
    "UPDATE comment_subject
     SET comment_count = comment_count + ?1,
         root_count    = root_count + ?2,
         all_count     = all_count + ?3,
         updated_at    = ?4
     WHERE id = ?5",
    rusqlite::params![
      delta.comments,
      delta.roots,
      delta.all,
      now_str,
      encode_id(subject_id)
    ],
  )?;
  // Post-increment value; this is the floor for a root comment.
  let root_count: i64 = tx.query_row(
    "SELECT root_count FROM comment_subject WHERE id = ?1",
    rusqlite::params![encode_id(subject_id)],
    |row| row.get(0),
  )?;

  let floor = if new.is_root() {
    root_count
  } else {
    let rd = RootCounterDelta::for_new_reply();
    let changed = tx.execute(
      "UPDATE comment_index
       SET reply_count      = reply_count + ?1,
           root_reply_count = root_reply_count + ?2,
           updated_at       = ?3
       WHERE id = ?4",
      rusqlite::params![
        rd.replies,
        rd.root_replies,
        now_str,
        encode_id(new.root)
      ],
    )?;
    if changed == 0 {
      return Err(Error::root_not_found(new.root));
    }
    tx.query_row(
      "SELECT root_reply_count FROM comment_index WHERE id = ?1",
      rusqlite::params![encode_id(new.root)],
      |row| row.get(0),
    )?
  };

  tx.execute(
    "INSERT INTO comment_index
       (id, subject_id, obj_id, obj_type, member_id, root, parent, floor,
        reply_count, root_reply_count, like_count, hate_count, state,
        created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, 0, 0, 0, ?9, ?9)",
    rusqlite::params![
      encode_id(new.id),
      encode_id(subject_id),
      encode_id(new.subject.obj_id),
      new.subject.obj_type,
      encode_id(new.member_id),
      encode_id(new.root),
      encode_id(new.parent),
      floor,
      now_str,
    ],
  )?;
  tx.execute(
    "INSERT INTO comment_content
       (id, at_member_ids, ip, platform, device, message, meta)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      encode_id(new.id),
      encode_members(&new.content.at_member_ids)?,
      new.content.ip,
      new.content.platform,
      new.content.device,
      new.content.message,
      new.content.meta,
    ],
  )?;
  tx.commit()?;

  Ok(SaveOutcome::Created(Comment {
    id:         new.id,
    subject_id,
    obj_id:     new.subject.obj_id,
    obj_type:   new.subject.obj_type,
    member_id:  new.member_id,
    root:       new.root,
    parent:     new.parent,
    parent_member_id: 0,
    floor,
    reply_count:      0,
    root_reply_count: 0,
    like_count: 0,
    hate_count: 0,
    state:      0,
    at_member_ids: new.content.at_member_ids,
    ip:       new.content.ip,
    platform: new.content.platform,
    device:   new.content.device,
    message:  new.content.message,
    meta:     new.content.meta,
    created_at: now,
    updated_at: now,
    replies: Vec::new(),
  }))
}

/// The like-ledger transaction. Record existence decides whether the delta
/// takes effect; the counter update and the ledger mutation commit together.
fn apply_like_tx(
  conn: &mut rusqlite::Connection,
  comment_id: u64,
  member_id: u64,
  delta: LikeDelta,
) -> Result<LikeOutcome> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let now_str = encode_dt(Utc::now());

  let comment_exists: Option<i64> = tx
    .query_row(
      "SELECT 1 FROM comment_index WHERE id = ?1",
      rusqlite::params![encode_id(comment_id)],
      |row| row.get(0),
    )
    .optional()?;
  if comment_exists.is_none() {
    return Err(Error::comment_not_found(comment_id));
  }

  let has_record: bool = tx
    .query_row(
      "SELECT 1 FROM comment_like WHERE member_id = ?1 AND comment_id = ?2",
      rusqlite::params![encode_id(member_id), encode_id(comment_id)],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);

  match (delta, has_record) {
    // Re-like with an extant record, or re-unlike without one: no-op.
    (LikeDelta::Like, true) | (LikeDelta::Unlike, false) => {
      return Ok(LikeOutcome::Noop);
    }
    (LikeDelta::Like, false) => {
      tx.execute(
        "INSERT INTO comment_like (member_id, comment_id, created_at)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![
          encode_id(member_id),
          encode_id(comment_id),
          now_str
        ],
      )?;
    }
    (LikeDelta::Unlike, true) => {
      tx.execute(
        "DELETE FROM comment_like WHERE member_id = ?1 AND comment_id = ?2",
        rusqlite::params![encode_id(member_id), encode_id(comment_id)],
      )?;
    }
    (LikeDelta::Noop, _) => return Ok(LikeOutcome::Noop),
  }

  tx.execute(
    "UPDATE comment_index
     SET like_count = like_count + ?1, updated_at = ?2
     WHERE id = ?3",
    rusqlite::params![delta.amount(), now_str, encode_id(comment_id)],
  )?;
  let like_count: i64 = tx.query_row(
    "SELECT like_count FROM comment_index WHERE id = ?1",
    rusqlite::params![encode_id(comment_id)],
    |row| row.get(0),
  )?;
  tx.commit()?;

  Ok(LikeOutcome::Applied { like_count })
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// `?, ?, ...` for an IN clause of `n` values.
fn placeholders(n: usize) -> String {
  let mut s = String::with_capacity(n * 3);
  for i in 0..n {
    if i > 0 {
      s.push_str(", ");
    }
    s.push('?');
  }
  s
}

/// Fill `parent_member_id` on each raw reply by looking up the authors of
/// all referenced parents in one query. A parent may be another reply or
/// the root itself; unresolvable parents stay at zero.
fn resolve_parent_members(
  conn: &rusqlite::Connection,
  rows: &mut [RawComment],
) -> rusqlite::Result<()> {
  let parent_ids: BTreeSet<i64> =
    rows.iter().map(|r| r.parent).filter(|&p| p != 0).collect();
  if parent_ids.is_empty() {
    return Ok(());
  }

  let sql = format!(
    "SELECT id, member_id FROM comment_index WHERE id IN ({})",
    placeholders(parent_ids.len()),
  );
  let mut stmt = conn.prepare(&sql)?;
  let authors: HashMap<i64, i64> = stmt
    .query_map(rusqlite::params_from_iter(parent_ids), |row| {
      Ok((row.get(0)?, row.get(1)?))
    })?
    .collect::<rusqlite::Result<_>>()?;

  for row in rows.iter_mut() {
    row.parent_member_id = authors.get(&row.parent).copied().unwrap_or(0);
  }
  Ok(())
}
