use log::trace;

use crate::{
  block::{Block, Region},
  free_list,
};

/// Bounded first-fit: returns the first listed block of at least `size`
/// bytes among the first `limit` blocks after the sentinel.
///
/// Giving up after `limit` candidates keeps a badly fragmented list from
/// making every allocation a full scan; the caller grows the arena instead.
pub(crate) fn first_fit(
  region: &Region,
  size: u32,
  limit: usize,
) -> Option<Block> {
  let found = free_list::iter(region)
    .take(limit)
    .find(|block| block.size(region) >= size);

  trace!("first_fit({size}) -> {:?}", found.map(Block::offset));

  found
}
