//! Like ledger types.
//!
//! The existence of a (member, comment) like record is the sole source of
//! truth for "this member currently likes this comment" — the counter on
//! the index row is derived, never consulted for the existence check.

use serde::{Deserialize, Serialize};

/// A normalized like mutation: anything above +1 clamps to +1, anything
/// below -1 clamps to -1, zero is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeDelta {
  Like,
  Unlike,
  Noop,
}

impl LikeDelta {
  /// Clamp a raw caller-supplied delta into the idempotent rule set.
  pub fn normalize(raw: i32) -> Self {
    match raw {
      0 => LikeDelta::Noop,
      d if d > 0 => LikeDelta::Like,
      _ => LikeDelta::Unlike,
    }
  }

  /// The signed amount this delta applies to `like_count` when it takes
  /// effect.
  pub fn amount(self) -> i64 {
    match self {
      LikeDelta::Like => 1,
      LikeDelta::Unlike => -1,
      LikeDelta::Noop => 0,
    }
  }
}

/// Outcome of applying a like delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
  /// The ledger changed; `like_count` is the post-mutation counter.
  Applied { like_count: i64 },
  /// Idempotent no-op: re-like with an extant record, re-unlike without
  /// one, or a zero delta.
  Noop,
}

/// A "member has liked this comment" fact, as returned by batch lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeItem {
  pub comment_id: u64,
  pub liked:      bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_clamps_out_of_range_deltas() {
    assert_eq!(LikeDelta::normalize(5), LikeDelta::Like);
    assert_eq!(LikeDelta::normalize(1), LikeDelta::Like);
    assert_eq!(LikeDelta::normalize(0), LikeDelta::Noop);
    assert_eq!(LikeDelta::normalize(-1), LikeDelta::Unlike);
    assert_eq!(LikeDelta::normalize(-100), LikeDelta::Unlike);
  }
}
