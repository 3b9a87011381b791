use log::trace;

use crate::{
  block::{Block, MIN_BLOCK, Region, Tag},
  free_list,
};

/// Marks the listed free `block` allocated with room for `size` bytes.
///
/// When the leftover could host a free block of its own, `block` shrinks to
/// exactly `size` and the tail becomes a free block in `block`'s old list
/// position. Otherwise the whole block is handed out and unlinked.
pub(crate) fn split(
  region: &mut Region,
  block: Block,
  size: u32,
) {
  let original = block.size(region);
  debug_assert!(original >= size);

  if original - size < MIN_BLOCK {
    free_list::remove(region, block);
    block.write_tag(region, Tag::allocated(original));
    trace!("split({}): whole {original}-byte block", block.offset());
    return;
  }

  let rest = Block::at(block.offset() + size);
  free_list::replace(region, block, rest);
  block.write_tag(region, Tag::allocated(size));
  rest.write_tag(region, Tag::free(original - size));

  trace!(
    "split({}): {size} allocated, {} free at {}",
    block.offset(),
    original - size,
    rest.offset()
  );
}

#[cfg(test)]
mod tests {
  use std::ptr::NonNull;

  use super::*;

  fn region_with_free(
    buf: &mut [u64],
    size: u32,
  ) -> (Region, Block) {
    let len = buf.len() * 8;
    let mut region = unsafe { Region::new(NonNull::from(buf).cast(), len) };
    free_list::init(&mut region);
    let block = Block::at(16);
    block.write_tag(&mut region, Tag::free(size));
    free_list::insert_after_sentinel(&mut region, block);
    (region, block)
  }

  #[test]
  fn test_split_leaves_free_tail() {
    let mut buf = [0u64; 16];
    let (mut region, block) = region_with_free(&mut buf, 112);

    split(&mut region, block, 40);

    assert_eq!(block.read_tag(&region), Tag::allocated(40));
    assert_eq!(block.read_footer(&region), Tag::allocated(40));

    let rest = Block::at(56);
    assert_eq!(rest.read_tag(&region), Tag::free(72));
    assert_eq!(rest.read_footer(&region), Tag::free(72));

    let listed: Vec<_> = free_list::iter(&region).collect();
    assert_eq!(listed, vec![rest]);
  }

  #[test]
  fn test_small_remainder_takes_whole_block() {
    let mut buf = [0u64; 16];
    let (mut region, block) = region_with_free(&mut buf, 48);

    // 48 - 40 = 8 cannot host a free block.
    split(&mut region, block, 40);

    assert_eq!(block.read_tag(&region), Tag::allocated(48));
    assert_eq!(block.read_footer(&region), Tag::allocated(48));
    assert_eq!(free_list::iter(&region).count(), 0);
  }

  #[test]
  fn test_remainder_of_exactly_min_block_splits() {
    let mut buf = [0u64; 16];
    let (mut region, block) = region_with_free(&mut buf, 56);

    split(&mut region, block, 40);

    assert_eq!(block.read_tag(&region), Tag::allocated(40));
    assert_eq!(Block::at(56).read_tag(&region), Tag::free(MIN_BLOCK));
    assert_eq!(free_list::iter(&region).count(), 1);
  }
}
