//! Per-subject ordered index cache.
//!
//! A sorted-container primitive: entries are scored by floor and read back
//! descending (newest root first). Upserts are idempotent and last-write-
//! wins per comment id, so rebuilds may race benignly. Nothing here
//! invalidates entries when counters mutate later; that staleness is
//! accepted by design.

use std::{
  collections::{BTreeMap, HashMap},
  future::Future,
  sync::{Arc, RwLock},
};

use banter_core::subject::SubjectIdentity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("cache unavailable: {0}")]
  Unavailable(String),
}

/// Cache key for a subject's root-comment index.
pub fn subject_key(identity: SubjectIdentity) -> String {
  format!("ci:{}:{}", identity.obj_id, identity.obj_type)
}

/// One scored, serialized cache entry. `id` disambiguates entries and makes
/// upserts last-write-wins per comment.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
  pub score:   i64,
  pub id:      u64,
  pub payload: String,
}

/// Abstraction over the sorted cache store.
pub trait IndexCache: Send + Sync {
  /// Insert or overwrite entries under `key`. Safe to re-run.
  fn upsert<'a>(
    &'a self,
    key: &'a str,
    entries: Vec<ScoredEntry>,
  ) -> impl Future<Output = Result<(), CacheError>> + Send + 'a;

  /// Serialized entries under `key`, score descending, paginated. An empty
  /// result is a cache miss; the caller decides what to do about it.
  fn range<'a>(
    &'a self,
    key: &'a str,
    offset: usize,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<String>, CacheError>> + Send + 'a;
}

// ─── In-memory implementation ────────────────────────────────────────────────

type Shard = BTreeMap<(i64, u64), String>;

/// Process-local cache over a `BTreeMap` per subject key.
///
/// Cloning is cheap; all clones share the underlying map.
#[derive(Clone, Default)]
pub struct MemoryIndexCache {
  inner: Arc<RwLock<HashMap<String, Shard>>>,
}

impl MemoryIndexCache {
  pub fn new() -> Self { Self::default() }

  /// Number of entries cached under `key`; test hook.
  pub fn len(&self, key: &str) -> usize {
    self
      .inner
      .read()
      .map(|map| map.get(key).map_or(0, Shard::len))
      .unwrap_or(0)
  }
}

impl IndexCache for MemoryIndexCache {
  async fn upsert(
    &self,
    key: &str,
    entries: Vec<ScoredEntry>,
  ) -> Result<(), CacheError> {
    let mut map = self
      .inner
      .write()
      .map_err(|_| CacheError::Unavailable("lock poisoned".into()))?;
    let shard = map.entry(key.to_owned()).or_default();
    for entry in entries {
      shard.insert((entry.score, entry.id), entry.payload);
    }
    Ok(())
  }

  async fn range(
    &self,
    key: &str,
    offset: usize,
    limit: usize,
  ) -> Result<Vec<String>, CacheError> {
    let map = self
      .inner
      .read()
      .map_err(|_| CacheError::Unavailable("lock poisoned".into()))?;
    let Some(shard) = map.get(key) else {
      return Ok(Vec::new());
    };
    Ok(
      shard
        .values()
        .rev()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect(),
    )
  }
}
