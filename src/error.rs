//! Error types for heap operations.

use thiserror::Error;

/// The only failure a heap operation reports.
///
/// Raised before any block is touched, so the heap is unchanged and still
/// consistent when a caller sees it.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum HeapError {
  /// The arena could not grow by the bytes needed, either because the
  /// growth primitive refused or because the request cannot be encoded in a
  /// 32-bit block size.
  #[error("arena exhausted: could not grow by {requested} bytes")]
  ArenaExhausted {
    /// Bytes the heap asked the arena for.
    requested: usize,
  },
}

/// A broken heap invariant, as found by [`Heap::check`](crate::Heap::check).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HeapCorruption {
  #[error("sentinel has tag {tag:#x}, expected a free {expected}-byte block")]
  Sentinel { tag: u32, expected: usize },

  #[error("block at offset {offset} has header {header:#x} but footer {footer:#x}")]
  TagMismatch { offset: usize, header: u32, footer: u32 },

  #[error("block at offset {offset} has invalid size {size}")]
  BadSize { offset: usize, size: usize },

  #[error("block at offset {offset} of {size} bytes runs past the arena end at {end}")]
  Overrun { offset: usize, size: usize, end: usize },

  #[error("free blocks at offsets {first} and {second} are adjacent")]
  AdjacentFree { first: usize, second: usize },

  #[error("free list links to offset {offset}, which is not an unlisted free block")]
  StrayListNode { offset: usize },

  #[error("free list node at offset {offset} has back link {prev}, expected {expected}")]
  BrokenLink { offset: usize, prev: usize, expected: usize },

  #[error("free block at offset {offset} is missing from the free list")]
  Unlisted { offset: usize },
}
