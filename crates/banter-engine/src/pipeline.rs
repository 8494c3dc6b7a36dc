//! Queue consumers: comment application and cache rebuild.
//!
//! One `SaveWorker` per save topic preserves per-subject ordering, which is
//! what keeps floor assignment gapless without row locks spanning workers.
//! Both workers expose `process_next` so tests can drive them to a known
//! point; `run` loops it for production use.

use std::sync::Arc;

use banter_core::{
  comment::{Comment, SaveOutcome},
  store::CommentStore,
};
use tracing::{debug, error, warn};

use crate::{
  cache::{IndexCache, ScoredEntry, subject_key},
  config::RetryPolicy,
  messages::{
    CacheRebuildMessage, SaveCommentMessage, TOPIC_CACHE_REBUILD,
    TOPIC_COMMENT_SAVE, dead_topic,
  },
  queue::{Message, Queue, QueueError, Subscription},
};

// ─── Save worker ─────────────────────────────────────────────────────────────

/// Applies queued comment creation requests through the store, then
/// best-effort populates the index cache with the committed entry.
pub struct SaveWorker<S, Q, C> {
  store: Arc<S>,
  queue: Arc<Q>,
  cache: Arc<C>,
  sub:   Subscription,
  retry: RetryPolicy,
}

impl<S, Q, C> SaveWorker<S, Q, C>
where
  S: CommentStore,
  Q: Queue,
  C: IndexCache,
{
  /// Subscribe to the save topic and return a ready worker.
  pub async fn subscribe(
    store: Arc<S>,
    queue: Arc<Q>,
    cache: Arc<C>,
    buffer: usize,
    retry: RetryPolicy,
  ) -> Result<Self, QueueError> {
    let sub = queue.subscribe(TOPIC_COMMENT_SAVE, buffer).await?;
    Ok(Self { store, queue, cache, sub, retry })
  }

  /// Consume and fully handle one message. `None` once the topic closes.
  pub async fn process_next(&mut self) -> Option<()> {
    let msg = self.sub.recv().await?;

    let save: SaveCommentMessage = match serde_json::from_slice(&msg.payload) {
      Ok(m) => m,
      Err(e) => {
        error!(error = %e, topic = %msg.topic, "undecodable save message");
        self.dead_letter(&msg).await;
        return Some(());
      }
    };

    let mut attempt = 0;
    loop {
      attempt += 1;
      match self.store.save_comment(save.comment.clone()).await {
        Ok(SaveOutcome::Created(comment)) => {
          self.populate_cache(&comment).await;
          break;
        }
        Ok(SaveOutcome::AlreadyApplied { id }) => {
          debug!(id, "redelivered save message; already applied");
          break;
        }
        Err(e) if attempt < self.retry.max_attempts => {
          warn!(
            error = %e,
            attempt,
            id = save.comment.id,
            "comment save failed; retrying"
          );
          tokio::time::sleep(self.retry.delay(attempt)).await;
        }
        Err(e) => {
          error!(
            error = %e,
            id = save.comment.id,
            "comment save exhausted retries; dead-lettering"
          );
          self.dead_letter(&msg).await;
          break;
        }
      }
    }
    Some(())
  }

  /// Drain the subscription until the topic closes.
  pub async fn run(mut self) {
    while self.process_next().await.is_some() {}
  }

  /// Push the committed comment into its subject's cache. Only roots live
  /// in the per-subject index; reply floors are scoped to their root and
  /// would collide with root floors. Failure here never unwinds the write.
  async fn populate_cache(&self, comment: &Comment) {
    if !comment.is_root() {
      return;
    }
    let key = subject_key(comment.identity());
    let payload = match serde_json::to_string(comment) {
      Ok(p) => p,
      Err(e) => {
        warn!(error = %e, id = comment.id, "cache entry serialization failed");
        return;
      }
    };
    let entry =
      ScoredEntry { score: comment.floor, id: comment.id, payload };
    if let Err(e) = self.cache.upsert(&key, vec![entry]).await {
      warn!(error = %e, key, "post-save cache population failed");
    }
  }

  async fn dead_letter(&self, msg: &Message) {
    let topic = dead_topic(&msg.topic);
    if let Err(e) = self.queue.publish(&topic, msg.payload.clone()).await {
      error!(error = %e, topic, "dead-letter publish failed; message lost");
    }
  }
}

// ─── Rebuild worker ──────────────────────────────────────────────────────────

/// Re-queries a page window from the store and idempotently upserts it into
/// the cache.
pub struct RebuildWorker<S, Q, C> {
  store: Arc<S>,
  queue: Arc<Q>,
  cache: Arc<C>,
  sub:   Subscription,
  retry: RetryPolicy,
}

impl<S, Q, C> RebuildWorker<S, Q, C>
where
  S: CommentStore,
  Q: Queue,
  C: IndexCache,
{
  /// Subscribe to the rebuild topic and return a ready worker.
  pub async fn subscribe(
    store: Arc<S>,
    queue: Arc<Q>,
    cache: Arc<C>,
    buffer: usize,
    retry: RetryPolicy,
  ) -> Result<Self, QueueError> {
    let sub = queue.subscribe(TOPIC_CACHE_REBUILD, buffer).await?;
    Ok(Self { store, queue, cache, sub, retry })
  }

  /// Consume and fully handle one rebuild request. `None` once the topic
  /// closes.
  pub async fn process_next(&mut self) -> Option<()> {
    let msg = self.sub.recv().await?;

    let req: CacheRebuildMessage = match serde_json::from_slice(&msg.payload) {
      Ok(m) => m,
      Err(e) => {
        error!(error = %e, topic = %msg.topic, "undecodable rebuild message");
        self.dead_letter(&msg).await;
        return Some(());
      }
    };

    let mut attempt = 0;
    loop {
      attempt += 1;
      match self.rebuild(req).await {
        Ok(()) => break,
        Err(e) if attempt < self.retry.max_attempts => {
          warn!(error = %e, attempt, obj_id = req.obj_id, "cache rebuild failed; retrying");
          tokio::time::sleep(self.retry.delay(attempt)).await;
        }
        Err(e) => {
          error!(error = %e, obj_id = req.obj_id, "cache rebuild exhausted retries; dead-lettering");
          self.dead_letter(&msg).await;
          break;
        }
      }
    }
    Some(())
  }

  /// Drain the subscription until the topic closes.
  pub async fn run(mut self) {
    while self.process_next().await.is_some() {}
  }

  async fn rebuild(&self, req: CacheRebuildMessage) -> Result<(), S::Error> {
    let page = self
      .store
      .comment_page(req.identity(), req.page_request())
      .await?;

    let mut entries = Vec::with_capacity(page.len());
    for comment in &page {
      match serde_json::to_string(comment) {
        Ok(payload) => entries.push(ScoredEntry {
          score: comment.floor,
          id: comment.id,
          payload,
        }),
        Err(e) => {
          warn!(error = %e, id = comment.id, "cache entry serialization failed")
        }
      }
    }

    let key = subject_key(req.identity());
    if let Err(e) = self.cache.upsert(&key, entries).await {
      // Cache trouble degrades reads to the store; not worth a retry.
      warn!(error = %e, key, "cache upsert failed during rebuild");
    }
    Ok(())
  }

  async fn dead_letter(&self, msg: &Message) {
    let topic = dead_topic(&msg.topic);
    if let Err(e) = self.queue.publish(&topic, msg.payload.clone()).await {
      error!(error = %e, topic, "dead-letter publish failed; message lost");
    }
  }
}
