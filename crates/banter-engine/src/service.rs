//! [`Comments`] — the engine facade callers talk to.
//!
//! Writes enter the queue and come back as a pre-assigned id; likes apply
//! synchronously against the ledger; listings read through the index cache
//! with a store fallback that schedules an asynchronous rebuild.

use std::{collections::HashMap, sync::Arc};

use banter_core::{
  comment::{Comment, NewComment, NewContent},
  id::IdGenerator,
  like::{LikeItem, LikeOutcome},
  store::{CommentStore, PageRequest},
  subject::{Subject, SubjectIdentity},
};
use tracing::warn;

use crate::{
  cache::{IndexCache, subject_key},
  config::EngineConfig,
  error::{EngineError, Result},
  messages::{
    CacheRebuildMessage, SaveCommentMessage, TOPIC_CACHE_REBUILD,
    TOPIC_COMMENT_SAVE,
  },
  queue::Queue,
};

/// A comment creation request as the caller sees it; the engine mints the
/// id.
#[derive(Debug, Clone)]
pub struct CreateComment {
  pub subject: SubjectIdentity,
  /// Owner of the commented-on object, recorded if the subject is created.
  pub subject_owner_id: u64,
  /// Verified author member id, supplied by the identity collaborator.
  pub member_id: u64,
  /// Root comment id, or 0 to start a new thread.
  pub root:   u64,
  /// Parent comment id, or 0.
  pub parent: u64,
  pub content: NewContent,
}

/// The engine facade. Cloning is cheap; all clones share the store, queue,
/// cache, and id generator.
pub struct Comments<S, Q, C> {
  store:  Arc<S>,
  queue:  Arc<Q>,
  cache:  Arc<C>,
  ids:    Arc<IdGenerator>,
  config: EngineConfig,
}

impl<S, Q, C> Clone for Comments<S, Q, C> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      queue:  self.queue.clone(),
      cache:  self.cache.clone(),
      ids:    self.ids.clone(),
      config: self.config.clone(),
    }
  }
}

impl<S, Q, C> Comments<S, Q, C>
where
  S: CommentStore,
  Q: Queue,
  C: IndexCache,
{
  pub fn new(
    store: Arc<S>,
    queue: Arc<Q>,
    cache: Arc<C>,
    config: EngineConfig,
  ) -> Self {
    Self { store, queue, cache, ids: Arc::new(IdGenerator::new()), config }
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Mint an id, enqueue the creation, and return the id immediately.
  ///
  /// The comment becomes visible to readers only after a
  /// [`SaveWorker`](crate::pipeline::SaveWorker) applies the message; the
  /// caller may display the id optimistically in the meantime.
  pub async fn create(&self, req: CreateComment) -> Result<u64> {
    let id = self.ids.next_id();
    let msg = SaveCommentMessage {
      comment: NewComment {
        id,
        subject: req.subject,
        subject_owner_id: req.subject_owner_id,
        member_id: req.member_id,
        root: req.root,
        parent: req.parent,
        content: req.content,
      },
    };
    let payload = serde_json::to_vec(&msg)?;
    self.queue.publish(TOPIC_COMMENT_SAVE, payload.into()).await?;
    Ok(id)
  }

  /// Apply a like/unlike delta for `member_id` on `comment_id`,
  /// synchronously against the ledger.
  pub async fn like(
    &self,
    comment_id: u64,
    member_id: u64,
    delta: i32,
  ) -> Result<LikeOutcome> {
    self
      .store
      .apply_like(comment_id, member_id, delta)
      .await
      .map_err(EngineError::store)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// One page of root comments for a subject, newest floor first, with
  /// reply previews attached.
  ///
  /// Cache first; on miss or cache failure, the store answers with
  /// identical ordering and a rebuild of this page window is enqueued.
  pub async fn comments(
    &self,
    identity: SubjectIdentity,
    page: PageRequest,
  ) -> Result<Vec<Comment>> {
    let mut roots = match self.cached_page(identity, page).await {
      Some(roots) => roots,
      None => {
        self.request_rebuild(identity, page).await;
        self
          .store
          .comment_page(identity, page)
          .await
          .map_err(EngineError::store)?
      }
    };
    self.attach_previews(&mut roots).await?;
    Ok(roots)
  }

  /// One page of replies under a root, newest floor first, parent authors
  /// resolved.
  pub async fn replies(
    &self,
    root_id: u64,
    page: PageRequest,
  ) -> Result<Vec<Comment>> {
    self
      .store
      .reply_page(root_id, page)
      .await
      .map_err(EngineError::store)
  }

  /// Single comment by id.
  pub async fn comment(&self, id: u64) -> Result<Option<Comment>> {
    self.store.get_comment(id).await.map_err(EngineError::store)
  }

  /// Which of `comment_ids` has `member_id` liked.
  pub async fn liked(
    &self,
    member_id: u64,
    comment_ids: Vec<u64>,
  ) -> Result<Vec<LikeItem>> {
    self
      .store
      .liked_comments(member_id, comment_ids)
      .await
      .map_err(EngineError::store)
  }

  /// Batch subject lookup for decorating external object listings with
  /// counters.
  pub async fn subjects(
    &self,
    obj_ids: Vec<u64>,
    obj_type: i32,
  ) -> Result<Vec<Subject>> {
    self
      .store
      .subjects_by_objects(obj_ids, obj_type)
      .await
      .map_err(EngineError::store)
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  /// Try to serve the page from cache. `None` means miss, failure, or an
  /// undecodable entry — all of which degrade to the store.
  async fn cached_page(
    &self,
    identity: SubjectIdentity,
    page: PageRequest,
  ) -> Option<Vec<Comment>> {
    let key = subject_key(identity);
    let payloads = match self
      .cache
      .range(&key, page.offset() as usize, page.size.max(0) as usize)
      .await
    {
      Ok(payloads) => payloads,
      Err(e) => {
        warn!(error = %e, key, "index cache unavailable; reading store");
        return None;
      }
    };
    if payloads.is_empty() {
      return None;
    }

    let mut roots = Vec::with_capacity(payloads.len());
    for payload in payloads {
      match serde_json::from_str::<Comment>(&payload) {
        Ok(c) => roots.push(c),
        Err(e) => {
          warn!(error = %e, key, "undecodable cache entry; reading store");
          return None;
        }
      }
    }
    Some(roots)
  }

  /// Best-effort: enqueue a rebuild for the page window that just missed.
  async fn request_rebuild(&self, identity: SubjectIdentity, page: PageRequest) {
    let msg = CacheRebuildMessage::new(identity, page);
    let payload = match serde_json::to_vec(&msg) {
      Ok(p) => p,
      Err(e) => {
        warn!(error = %e, "rebuild message serialization failed");
        return;
      }
    };
    if let Err(e) = self.queue.publish(TOPIC_CACHE_REBUILD, payload.into()).await
    {
      warn!(error = %e, "rebuild request publish failed");
    }
  }

  /// Fetch and attach up to `reply_preview` replies per root, oldest floor
  /// first, so "replying to X" attribution needs no extra round trip.
  async fn attach_previews(&self, roots: &mut [Comment]) -> Result<()> {
    if self.config.reply_preview <= 0 || roots.is_empty() {
      return Ok(());
    }

    let root_ids: Vec<u64> = roots.iter().map(|c| c.id).collect();
    let previews = self
      .store
      .reply_previews(root_ids, self.config.reply_preview)
      .await
      .map_err(EngineError::store)?;

    let mut by_root: HashMap<u64, Vec<Comment>> = HashMap::new();
    for reply in previews {
      by_root.entry(reply.root).or_default().push(reply);
    }
    for root in roots.iter_mut() {
      root.replies = by_root.remove(&root.id).unwrap_or_default();
    }
    Ok(())
  }
}
