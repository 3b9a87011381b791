//! Circular doubly-linked list of free blocks.
//!
//! Links are arena offsets stored inside the free blocks themselves. The
//! sentinel at offset 0 anchors the ring: an empty list is the sentinel
//! pointing at itself.

use crate::block::{Block, MIN_BLOCK, Region, Tag};

/// Lays down the sentinel as a one-node ring.
pub(crate) fn init(region: &mut Region) {
  let sentinel = Block::SENTINEL;
  sentinel.write_tag(region, Tag::free(MIN_BLOCK));
  sentinel.set_next(region, sentinel);
  sentinel.set_prev(region, sentinel);
}

/// Links `block` in directly after the sentinel. `block` must not already be
/// on the list.
pub(crate) fn insert_after_sentinel(
  region: &mut Region,
  block: Block,
) {
  let sentinel = Block::SENTINEL;
  let first = sentinel.next(region);

  block.set_next(region, first);
  block.set_prev(region, sentinel);
  first.set_prev(region, block);
  sentinel.set_next(region, block);
}

/// Unlinks a listed block. Never called on the sentinel.
pub(crate) fn remove(
  region: &mut Region,
  block: Block,
) {
  debug_assert_ne!(block, Block::SENTINEL, "the sentinel never leaves the free list");
  let prev = block.prev(region);
  let next = block.next(region);

  prev.set_next(region, next);
  next.set_prev(region, prev);
}

/// Puts `new` into the list position `old` holds, unlinking `old`.
pub(crate) fn replace(
  region: &mut Region,
  old: Block,
  new: Block,
) {
  debug_assert_ne!(old, Block::SENTINEL, "the sentinel never leaves the free list");
  let prev = old.prev(region);
  let next = old.next(region);

  new.set_prev(region, prev);
  new.set_next(region, next);
  prev.set_next(region, new);
  next.set_prev(region, new);
}

/// Iterates the free blocks in list order, sentinel excluded.
pub(crate) fn iter(region: &Region) -> FreeBlocks<'_> {
  FreeBlocks {
    region,
    cursor: Block::SENTINEL.next(region),
  }
}

pub(crate) struct FreeBlocks<'a> {
  region: &'a Region,
  cursor: Block,
}

impl Iterator for FreeBlocks<'_> {
  type Item = Block;

  fn next(&mut self) -> Option<Block> {
    if self.cursor == Block::SENTINEL {
      return None;
    }
    let block = self.cursor;
    self.cursor = block.next(self.region);
    Some(block)
  }
}

#[cfg(test)]
mod tests {
  use std::ptr::NonNull;

  use super::*;

  fn region(buf: &mut [u64]) -> Region {
    let len = buf.len() * 8;
    unsafe { Region::new(NonNull::from(buf).cast(), len) }
  }

  fn offsets(region: &Region) -> Vec<u32> {
    iter(region).map(Block::offset).collect()
  }

  #[test]
  fn test_empty_list_is_sentinel_ring() {
    let mut buf = [0u64; 2];
    let mut region = region(&mut buf);
    init(&mut region);

    assert_eq!(Block::SENTINEL.next(&region), Block::SENTINEL);
    assert_eq!(Block::SENTINEL.prev(&region), Block::SENTINEL);
    assert_eq!(Block::SENTINEL.size(&region), MIN_BLOCK);
    assert!(offsets(&region).is_empty());
  }

  #[test]
  fn test_insert_goes_to_front() {
    let mut buf = [0u64; 8];
    let mut region = region(&mut buf);
    init(&mut region);

    insert_after_sentinel(&mut region, Block::at(16));
    insert_after_sentinel(&mut region, Block::at(32));
    insert_after_sentinel(&mut region, Block::at(48));

    assert_eq!(offsets(&region), vec![48, 32, 16]);
    assert_eq!(Block::SENTINEL.prev(&region), Block::at(16));
    assert_eq!(Block::at(16).next(&region), Block::SENTINEL);
  }

  #[test]
  fn test_remove_relinks_neighbours() {
    let mut buf = [0u64; 8];
    let mut region = region(&mut buf);
    init(&mut region);
    for offset in [16, 32, 48] {
      insert_after_sentinel(&mut region, Block::at(offset));
    }

    remove(&mut region, Block::at(32));
    assert_eq!(offsets(&region), vec![48, 16]);
    assert_eq!(Block::at(16).prev(&region), Block::at(48));

    remove(&mut region, Block::at(48));
    remove(&mut region, Block::at(16));
    assert!(offsets(&region).is_empty());
    assert_eq!(Block::SENTINEL.prev(&region), Block::SENTINEL);
  }

  #[test]
  fn test_replace_keeps_position() {
    let mut buf = [0u64; 10];
    let mut region = region(&mut buf);
    init(&mut region);
    for offset in [16, 32, 48] {
      insert_after_sentinel(&mut region, Block::at(offset));
    }

    replace(&mut region, Block::at(32), Block::at(64));

    assert_eq!(offsets(&region), vec![48, 64, 16]);
    assert_eq!(Block::at(16).prev(&region), Block::at(64));
    assert_eq!(Block::at(48).next(&region), Block::at(64));
  }
}
