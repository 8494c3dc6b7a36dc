//! Queue abstraction for the write pipeline, plus an in-process broker.
//!
//! The engine consumes the queue as an external primitive: `publish` means
//! "accepted into the queue", delivery is at-least-once, and ordering is
//! preserved per topic. [`InMemoryBroker`] implements the trait over
//! `tokio::sync::mpsc` for tests and single-process deployments; messages
//! published before any subscriber exists are buffered and handed to the
//! first subscriber.

use std::{
  collections::{HashMap, VecDeque},
  future::Future,
  sync::Arc,
};

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

#[derive(Debug, Error)]
pub enum QueueError {
  #[error("queue rejected publish to topic {0:?}")]
  Publish(String),
}

/// A delivered message.
#[derive(Debug, Clone)]
pub struct Message {
  pub topic:   String,
  pub payload: Bytes,
}

/// Abstraction over a durable message queue.
pub trait Queue: Send + Sync {
  /// Enqueue `payload` on `topic`. Returning `Ok` means accepted, not
  /// applied; publish is fire-and-forget beyond that.
  fn publish<'a>(
    &'a self,
    topic: &'a str,
    payload: Bytes,
  ) -> impl Future<Output = Result<(), QueueError>> + Send + 'a;

  /// Open a subscription on `topic` with the given channel capacity.
  fn subscribe<'a>(
    &'a self,
    topic: &'a str,
    buffer: usize,
  ) -> impl Future<Output = Result<Subscription, QueueError>> + Send + 'a;
}

/// Receiving half of a topic subscription.
pub struct Subscription {
  rx: mpsc::Receiver<Message>,
}

impl Subscription {
  /// Next message, in publish order. `None` once the topic is closed.
  pub async fn recv(&mut self) -> Option<Message> { self.rx.recv().await }
}

// ─── In-memory broker ────────────────────────────────────────────────────────

#[derive(Default)]
struct TopicState {
  /// Messages published before the first subscriber arrived.
  pending: VecDeque<Message>,
  subs:    Vec<mpsc::Sender<Message>>,
}

/// In-process fan-out broker over bounded channels.
///
/// Cloning is cheap; all clones share the topic table.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
  topics: Arc<Mutex<HashMap<String, TopicState>>>,
}

impl InMemoryBroker {
  pub fn new() -> Self { Self::default() }
}

impl Queue for InMemoryBroker {
  async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), QueueError> {
    let msg = Message { topic: topic.to_owned(), payload };

    // Clone the senders out so delivery awaits happen outside the lock;
    // a full subscriber channel then only stalls publishers of its own
    // topic.
    let senders = {
      let mut topics = self.topics.lock().await;
      let state = topics.entry(topic.to_owned()).or_default();
      if state.subs.is_empty() {
        state.pending.push_back(msg);
        return Ok(());
      }
      state.subs.clone()
    };

    let mut delivered = false;
    let mut closed = false;
    for sender in &senders {
      if sender.send(msg.clone()).await.is_ok() {
        delivered = true;
      } else {
        closed = true;
      }
    }

    if closed {
      let mut topics = self.topics.lock().await;
      let state = topics.entry(topic.to_owned()).or_default();
      state.subs.retain(|sender| !sender.is_closed());
      if !delivered {
        // Every subscriber is gone; keep the message for the next one.
        state.pending.push_back(msg);
      }
    }
    Ok(())
  }

  async fn subscribe(
    &self,
    topic: &str,
    buffer: usize,
  ) -> Result<Subscription, QueueError> {
    let mut topics = self.topics.lock().await;
    let state = topics.entry(topic.to_owned()).or_default();

    // Size the channel so buffered history always fits.
    let capacity = buffer.max(state.pending.len()).max(1);
    let (tx, rx) = mpsc::channel(capacity);
    for msg in state.pending.drain(..) {
      // Cannot fail: the channel was sized for the backlog and the
      // receiver has consumed nothing yet.
      let _ = tx.try_send(msg);
    }
    state.subs.push(tx);
    Ok(Subscription { rx })
  }
}
