use std::collections::BTreeSet;

use crate::{
  align::ALIGNMENT,
  block::{Block, MIN_BLOCK, OVERHEAD, Region, Tag},
  error::HeapCorruption,
};

/// Walks the whole arena and the free list, reporting the first broken
/// invariant.
pub(crate) fn check(region: &Region) -> Result<(), HeapCorruption> {
  let sentinel = Block::SENTINEL;
  let tag = sentinel.read_tag(region);
  if tag != Tag::free(MIN_BLOCK) || sentinel.read_footer(region) != tag {
    return Err(HeapCorruption::Sentinel {
      tag: tag.word(),
      expected: OVERHEAD,
    });
  }

  let free = walk_blocks(region)?;
  walk_free_list(region, free)
}

/// Checks tiling and tags; returns the offsets of free non-sentinel blocks.
fn walk_blocks(region: &Region) -> Result<BTreeSet<usize>, HeapCorruption> {
  let end = region.len();
  let mut free = BTreeSet::new();
  let mut previous_free = None;
  let mut offset = 0;

  while offset < end {
    let block = Block::at(offset as u32);
    let header = block.read_tag(region);
    let size = header.size() as usize;

    if size < OVERHEAD || size % ALIGNMENT != 0 {
      return Err(HeapCorruption::BadSize { offset, size });
    }
    if offset + size > end {
      return Err(HeapCorruption::Overrun { offset, size, end });
    }

    let footer = block.read_footer(region);
    if footer != header {
      return Err(HeapCorruption::TagMismatch {
        offset,
        header: header.word(),
        footer: footer.word(),
      });
    }

    if header.is_allocated() || block == Block::SENTINEL {
      previous_free = None;
    } else {
      if let Some(first) = previous_free {
        return Err(HeapCorruption::AdjacentFree { first, second: offset });
      }
      free.insert(offset);
      previous_free = Some(offset);
    }

    offset += size;
  }

  Ok(free)
}

/// Checks that the list holds every free block exactly once, with back
/// links that mirror the forward ones.
fn walk_free_list(
  region: &Region,
  mut free: BTreeSet<usize>,
) -> Result<(), HeapCorruption> {
  let sentinel = Block::SENTINEL;
  let mut prev = sentinel;
  let mut node = sentinel.next(region);

  while node != sentinel {
    let offset = node.offset() as usize;
    if !free.remove(&offset) {
      return Err(HeapCorruption::StrayListNode { offset });
    }
    linked_back(region, node, prev)?;

    prev = node;
    node = node.next(region);
  }
  linked_back(region, sentinel, prev)?;

  match free.first() {
    Some(&offset) => Err(HeapCorruption::Unlisted { offset }),
    None => Ok(()),
  }
}

fn linked_back(
  region: &Region,
  node: Block,
  expected: Block,
) -> Result<(), HeapCorruption> {
  let back = node.prev(region);
  if back == expected {
    return Ok(());
  }
  Err(HeapCorruption::BrokenLink {
    offset: node.offset() as usize,
    prev: back.offset() as usize,
    expected: expected.offset() as usize,
  })
}
