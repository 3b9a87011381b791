use log::trace;

use crate::{
  block::{Block, Region, Tag},
  free_list,
};

/// Where a freed block ended up after merging with its neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Coalesced {
  /// Absorbed into the listed free block in front of it.
  IntoPreceding(Block),
  /// Still its own block, not yet on the free list.
  Unlinked(Block),
}

/// Merges the unlisted free `block` with free physical neighbours.
pub(crate) fn coalesce(
  region: &mut Region,
  block: Block,
) -> Coalesced {
  if let Some(next) = block.following(region) {
    if !next.is_allocated(region) {
      free_list::remove(region, next);
      let size = block.size(region) + next.size(region);
      block.write_tag(region, Tag::free(size));
      trace!("coalesce({}): absorbed {} forward", block.offset(), next.offset());
    }
  }

  match merge_backward(region, block) {
    Some(into) => Coalesced::IntoPreceding(into),
    None => Coalesced::Unlinked(block),
  }
}

/// Folds `block` into the block physically before it when that one is free
/// and not the sentinel. Returns the surviving block.
pub(crate) fn merge_backward(
  region: &mut Region,
  block: Block,
) -> Option<Block> {
  let prev = block.preceding(region)?;
  if prev == Block::SENTINEL || prev.is_allocated(region) {
    return None;
  }

  let size = prev.size(region) + block.size(region);
  prev.write_tag(region, Tag::free(size));
  trace!("coalesce({}): merged back into {}", block.offset(), prev.offset());

  Some(prev)
}

#[cfg(test)]
mod tests {
  use std::ptr::NonNull;

  use super::*;

  /// Lays out `tags` after the sentinel and lists every free one.
  fn layout(
    buf: &mut [u64],
    tags: &[Tag],
  ) -> (Region, Vec<Block>) {
    let len = buf.len() * 8;
    let mut region = unsafe { Region::new(NonNull::from(buf).cast(), len) };
    free_list::init(&mut region);

    let mut blocks = Vec::new();
    let mut offset = 16;
    for &tag in tags {
      let block = Block::at(offset);
      block.write_tag(&mut region, tag);
      if !tag.is_allocated() {
        free_list::insert_after_sentinel(&mut region, block);
      }
      blocks.push(block);
      offset += tag.size();
    }
    assert_eq!(offset as usize, region.len());
    (region, blocks)
  }

  fn free_tag(
    region: &mut Region,
    block: Block,
  ) {
    let size = block.size(region);
    block.write_tag(region, Tag::free(size));
  }

  #[test]
  fn test_isolated_block_stays_unlinked() {
    let mut buf = [0u64; 11];
    let (mut region, blocks) = layout(&mut buf, &[Tag::allocated(24), Tag::allocated(24), Tag::allocated(24)]);

    free_tag(&mut region, blocks[1]);
    assert_eq!(coalesce(&mut region, blocks[1]), Coalesced::Unlinked(blocks[1]));
    assert_eq!(blocks[1].size(&region), 24);
  }

  #[test]
  fn test_forward_merge_unlinks_neighbour() {
    let mut buf = [0u64; 11];
    let (mut region, blocks) = layout(&mut buf, &[Tag::allocated(24), Tag::allocated(24), Tag::free(24)]);

    free_tag(&mut region, blocks[1]);
    assert_eq!(coalesce(&mut region, blocks[1]), Coalesced::Unlinked(blocks[1]));
    assert_eq!(blocks[1].read_tag(&region), Tag::free(48));
    assert_eq!(blocks[1].read_footer(&region), Tag::free(48));
    assert_eq!(free_list::iter(&region).count(), 0);
  }

  #[test]
  fn test_backward_merge_reports_survivor() {
    let mut buf = [0u64; 11];
    let (mut region, blocks) = layout(&mut buf, &[Tag::free(24), Tag::allocated(24), Tag::allocated(24)]);

    free_tag(&mut region, blocks[1]);
    assert_eq!(coalesce(&mut region, blocks[1]), Coalesced::IntoPreceding(blocks[0]));
    assert_eq!(blocks[0].read_tag(&region), Tag::free(48));
    assert_eq!(blocks[0].read_footer(&region), Tag::free(48));
    let listed: Vec<_> = free_list::iter(&region).collect();
    assert_eq!(listed, vec![blocks[0]]);
  }

  #[test]
  fn test_merge_both_ways() {
    let mut buf = [0u64; 11];
    let (mut region, blocks) = layout(&mut buf, &[Tag::free(24), Tag::allocated(24), Tag::free(24)]);

    free_tag(&mut region, blocks[1]);
    assert_eq!(coalesce(&mut region, blocks[1]), Coalesced::IntoPreceding(blocks[0]));
    assert_eq!(blocks[0].read_tag(&region), Tag::free(72));
    assert_eq!(blocks[0].following(&region), None);
    let listed: Vec<_> = free_list::iter(&region).collect();
    assert_eq!(listed, vec![blocks[0]]);
  }

  #[test]
  fn test_never_merges_into_sentinel() {
    let mut buf = [0u64; 5];
    let (mut region, blocks) = layout(&mut buf, &[Tag::allocated(24)]);

    free_tag(&mut region, blocks[0]);
    assert_eq!(merge_backward(&mut region, blocks[0]), None);
    assert_eq!(coalesce(&mut region, blocks[0]), Coalesced::Unlinked(blocks[0]));
    assert_eq!(Block::SENTINEL.size(&region), 16);
  }
}
