//! Engine configuration.

use serde::Deserialize;
use std::time::Duration;

/// Tunables for the write pipeline and read path.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Channel capacity handed to `Queue::subscribe`.
  pub queue_buffer: usize,
  /// How many replies to preview under each root comment on listing; 0
  /// disables previews.
  pub reply_preview: i64,
  /// Retry policy for pipeline message application.
  pub retry: RetryPolicy,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { queue_buffer: 256, reply_preview: 3, retry: RetryPolicy::default() }
  }
}

/// Bounded retry with linear backoff; exhausted messages go to the dead
/// topic instead of being dropped.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub backoff_ms:   u64,
}

impl Default for RetryPolicy {
  fn default() -> Self { Self { max_attempts: 3, backoff_ms: 50 } }
}

impl RetryPolicy {
  /// Delay before the given retry (1-based attempt that just failed).
  pub fn delay(&self, attempt: u32) -> Duration {
    Duration::from_millis(self.backoff_ms.saturating_mul(attempt as u64))
  }
}
