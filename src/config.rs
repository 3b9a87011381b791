//! Heap tuning parameters.

/// How much the arena grows when no free block satisfies a request of S
/// bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Growth {
  /// Grow by S and hand all of it out as the new block.
  Exact,
  /// Grow by 2×S: a free block of S at the front, the new block of S behind
  /// it. The free front merges with a free block ending at the old frontier.
  Double,
}

impl Growth {
  pub(crate) fn factor(self) -> usize {
    match self {
      Growth::Exact => 1,
      Growth::Double => 2,
    }
  }
}

/// Configuration for a [`Heap`](crate::Heap).
///
/// Fixed at construction. The defaults keep allocate and resize deliberately
/// asymmetric: allocate misses double, resize misses do not. Set both growth
/// fields to the same policy to unify them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
  /// Free blocks examined by a first-fit search before giving up and growing.
  ///
  /// Default: 400.
  pub search_limit: usize,

  /// Growth on an allocate miss.
  ///
  /// Default: [`Growth::Double`].
  pub allocate_growth: Growth,

  /// Growth on a resize miss.
  ///
  /// Default: [`Growth::Exact`].
  pub resize_growth: Growth,
}

impl HeapConfig {
  pub const DEFAULT_SEARCH_LIMIT: usize = 400;

  /// Both operations grow by exactly the block they need.
  pub fn exact() -> Self {
    Self {
      allocate_growth: Growth::Exact,
      resize_growth: Growth::Exact,
      ..Self::default()
    }
  }

  pub fn with_search_limit(
    mut self,
    search_limit: usize,
  ) -> Self {
    self.search_limit = search_limit;
    self
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      search_limit: Self::DEFAULT_SEARCH_LIMIT,
      allocate_growth: Growth::Double,
      resize_growth: Growth::Exact,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_keep_growth_asymmetry() {
    let config = HeapConfig::default();
    assert_eq!(config.search_limit, 400);
    assert_eq!(config.allocate_growth.factor(), 2);
    assert_eq!(config.resize_growth.factor(), 1);
  }

  #[test]
  fn test_exact_unifies_growth() {
    let config = HeapConfig::exact().with_search_limit(8);
    assert_eq!(config.allocate_growth, Growth::Exact);
    assert_eq!(config.resize_growth, Growth::Exact);
    assert_eq!(config.search_limit, 8);
  }
}
