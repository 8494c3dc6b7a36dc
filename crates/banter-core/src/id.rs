//! Process-local snowflake-style id generation.
//!
//! Ids pack milliseconds since a fixed epoch above a per-millisecond
//! sequence, so they sort roughly by creation time and always fit in 63
//! bits (SQLite stores them as signed INTEGER). Zero is never minted — it
//! is the "no root"/"no parent" sentinel.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Bits reserved for the per-millisecond sequence.
const SEQUENCE_BITS: u32 = 22;

/// 2024-01-01T00:00:00Z, in unix milliseconds.
const EPOCH_MS: i64 = 1_704_067_200_000;

/// Monotonic id generator. Cheap to share behind an `Arc`; `next_id` is
/// lock-free.
#[derive(Debug, Default)]
pub struct IdGenerator {
  last: AtomicU64,
}

impl IdGenerator {
  pub fn new() -> Self { Self::default() }

  /// Mint the next id: strictly greater than every id previously returned
  /// by this generator, and never zero.
  pub fn next_id(&self) -> u64 {
    let now = (Utc::now().timestamp_millis() - EPOCH_MS).max(1) as u64;
    let candidate = now << SEQUENCE_BITS;

    let mut prev = self.last.load(Ordering::Relaxed);
    loop {
      let next = candidate.max(prev + 1);
      match self.last.compare_exchange_weak(
        prev,
        next,
        Ordering::Relaxed,
        Ordering::Relaxed,
      ) {
        Ok(_) => return next,
        Err(observed) => prev = observed,
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ids_are_strictly_increasing_and_nonzero() {
    let ids = IdGenerator::new();
    let mut prev = 0;
    for _ in 0..10_000 {
      let id = ids.next_id();
      assert!(id > prev);
      prev = id;
    }
  }

  #[test]
  fn ids_fit_in_a_signed_64_bit_integer() {
    let ids = IdGenerator::new();
    let id = ids.next_id();
    assert!(id < (1 << 63));
  }
}
