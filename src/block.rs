use std::ptr::NonNull;

use crate::align;

/// Size of one boundary-tag or link word.
pub(crate) const WORD: u32 = 4;

/// Header, two free-list links and footer, aligned.
///
/// This is the size of the sentinel and the smallest block that can sit on
/// the free list.
pub const OVERHEAD: usize = align!(4 * WORD as usize);

pub(crate) const MIN_BLOCK: u32 = OVERHEAD as u32;

/// Distance from the block start to the payload handed to callers.
pub(crate) const PAYLOAD_OFFSET: u32 = 8;

const NEXT_OFFSET: u32 = WORD;
const PREV_OFFSET: u32 = 2 * WORD;

const ALLOCATED: u32 = 0x1;

/// The bytes the heap has carved so far, starting at the arena's low end.
///
/// All block accesses go through here so that every word read or written is
/// an offset from one base pointer.
pub(crate) struct Region {
  base: NonNull<u8>,
  len: usize,
}

impl Region {
  /// # Safety
  ///
  /// `base` must be 8-byte aligned and valid for reads and writes of `len`
  /// bytes for as long as the region is used.
  pub(crate) unsafe fn new(
    base: NonNull<u8>,
    len: usize,
  ) -> Self {
    Self { base, len }
  }

  /// # Safety
  ///
  /// The `bytes` directly after the current end must have just been handed
  /// out by the arena and stay valid.
  pub(crate) unsafe fn extend(
    &mut self,
    bytes: usize,
  ) {
    self.len += bytes;
  }

  pub(crate) fn base(&self) -> NonNull<u8> {
    self.base
  }

  pub(crate) fn len(&self) -> usize {
    self.len
  }

  pub(crate) fn end(&self) -> *const u8 {
    self.base.as_ptr().wrapping_add(self.len)
  }

  pub(crate) fn contains(
    &self,
    ptr: *const u8,
  ) -> bool {
    let addr = ptr as usize;
    let low = self.base.as_ptr() as usize;
    addr >= low && addr < low + self.len
  }

  pub(crate) fn read(
    &self,
    offset: u32,
  ) -> u32 {
    debug_assert!(offset as usize + WORD as usize <= self.len, "read at {offset} past {}", self.len);
    // Offsets are produced by the heap itself and always land on a word
    // inside the region.
    unsafe { self.base.as_ptr().add(offset as usize).cast::<u32>().read() }
  }

  pub(crate) fn write(
    &mut self,
    offset: u32,
    value: u32,
  ) {
    debug_assert!(offset as usize + WORD as usize <= self.len, "write at {offset} past {}", self.len);
    unsafe { self.base.as_ptr().add(offset as usize).cast::<u32>().write(value) }
  }
}

/// A block's size-and-flag word, as stored in both its header and footer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Tag(u32);

impl Tag {
  pub(crate) fn free(size: u32) -> Self {
    debug_assert_eq!(size as usize % crate::align::ALIGNMENT, 0);
    Self(size)
  }

  pub(crate) fn allocated(size: u32) -> Self {
    debug_assert_eq!(size as usize % crate::align::ALIGNMENT, 0);
    Self(size | ALLOCATED)
  }

  pub(crate) fn word(self) -> u32 {
    self.0
  }

  pub(crate) fn size(self) -> u32 {
    self.0 & !ALLOCATED
  }

  pub(crate) fn is_allocated(self) -> bool {
    self.0 & ALLOCATED != 0
  }
}

/// Handle to a block, identified by its offset from the arena's low end.
///
/// ```text
///   offset 0      4       8      12            size - 4     size
///   ┌────────┬───────┬───────┬─────── ··· ─────┬────────┐
///   │ header │ next  │ prev  │                  │ footer │   free
///   └────────┴───────┴───────┴─────── ··· ─────┴────────┘
///   ┌────────┬───────┬──────────────── ··· ─────┬────────┐
///   │ header │  pad  │ payload ...              │ footer │   allocated
///   └────────┴───────┴──────────────── ··· ─────┴────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Block(u32);

impl Block {
  /// The permanent free-list anchor at the very start of the arena.
  pub(crate) const SENTINEL: Block = Block(0);

  pub(crate) fn at(offset: u32) -> Self {
    Self(offset)
  }

  pub(crate) fn offset(self) -> u32 {
    self.0
  }

  /// Reads the header's size-and-flag word.
  pub(crate) fn read_tag(
    self,
    region: &Region,
  ) -> Tag {
    Tag(region.read(self.0))
  }

  /// Reads the footer word located through the header's size.
  pub(crate) fn read_footer(
    self,
    region: &Region,
  ) -> Tag {
    Tag(region.read(self.0 + self.size(region) - WORD))
  }

  pub(crate) fn size(
    self,
    region: &Region,
  ) -> u32 {
    self.read_tag(region).size()
  }

  pub(crate) fn is_allocated(
    self,
    region: &Region,
  ) -> bool {
    self.read_tag(region).is_allocated()
  }

  /// Stamps `tag` into both the header and the footer it implies.
  pub(crate) fn write_tag(
    self,
    region: &mut Region,
    tag: Tag,
  ) {
    self.write_header(region, tag);
    self.write_footer(region, tag);
  }

  fn write_header(
    self,
    region: &mut Region,
    tag: Tag,
  ) {
    region.write(self.0, tag.word());
  }

  fn write_footer(
    self,
    region: &mut Region,
    tag: Tag,
  ) {
    region.write(self.0 + tag.size() - WORD, tag.word());
  }

  pub(crate) fn next(
    self,
    region: &Region,
  ) -> Block {
    Block(region.read(self.0 + NEXT_OFFSET))
  }

  pub(crate) fn prev(
    self,
    region: &Region,
  ) -> Block {
    Block(region.read(self.0 + PREV_OFFSET))
  }

  pub(crate) fn set_next(
    self,
    region: &mut Region,
    next: Block,
  ) {
    region.write(self.0 + NEXT_OFFSET, next.0);
  }

  pub(crate) fn set_prev(
    self,
    region: &mut Region,
    prev: Block,
  ) {
    region.write(self.0 + PREV_OFFSET, prev.0);
  }

  /// The block physically after this one, if the arena extends past it.
  pub(crate) fn following(
    self,
    region: &Region,
  ) -> Option<Block> {
    let end = self.0 + self.size(region);
    ((end as usize) < region.len()).then_some(Block(end))
  }

  /// The block physically before this one, located through its footer.
  pub(crate) fn preceding(
    self,
    region: &Region,
  ) -> Option<Block> {
    if self.0 == 0 {
      return None;
    }
    let footer = Tag(region.read(self.0 - WORD));
    Some(Block(self.0 - footer.size()))
  }

  pub(crate) fn payload(
    self,
    region: &Region,
  ) -> NonNull<u8> {
    unsafe { region.base().add((self.0 + PAYLOAD_OFFSET) as usize) }
  }

  pub(crate) fn from_payload(
    region: &Region,
    payload: NonNull<u8>,
  ) -> Block {
    let offset = (payload.as_ptr() as usize).wrapping_sub(region.base().as_ptr() as usize);
    Block(offset.wrapping_sub(PAYLOAD_OFFSET as usize) as u32)
  }

  /// Bytes a caller may use in this block's payload.
  pub(crate) fn capacity(
    self,
    region: &Region,
  ) -> usize {
    (self.size(region) - PAYLOAD_OFFSET - WORD) as usize
  }

  pub(crate) fn info(
    self,
    region: &Region,
  ) -> BlockInfo {
    let tag = self.read_tag(region);
    BlockInfo {
      offset: self.0 as usize,
      size: tag.size() as usize,
      allocated: tag.is_allocated(),
    }
  }
}

/// Walks blocks in address order, starting at the sentinel.
pub(crate) fn physical(region: &Region) -> impl Iterator<Item = Block> + '_ {
  std::iter::successors(Some(Block::SENTINEL), move |block| block.following(region))
}

/// A snapshot of one block, as reported by the heap's walkers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  /// Byte offset of the block's header from the arena's low end.
  pub offset: usize,
  /// Total block size, overhead included.
  pub size: usize,
  pub allocated: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn region(buf: &mut [u64]) -> Region {
    let len = buf.len() * 8;
    unsafe { Region::new(NonNull::from(buf).cast(), len) }
  }

  #[test]
  fn test_overhead_is_aligned() {
    assert_eq!(OVERHEAD, 16);
    assert_eq!(OVERHEAD % crate::align::ALIGNMENT, 0);
  }

  #[test]
  fn test_flag_does_not_corrupt_size() {
    let tag = Tag::allocated(120);
    assert_eq!(tag.size(), 120);
    assert!(tag.is_allocated());
    assert_eq!(tag.word(), 121);

    let tag = Tag::free(120);
    assert_eq!(tag.size(), 120);
    assert!(!tag.is_allocated());
  }

  #[test]
  fn test_header_and_footer_written_together() {
    let mut buf = [0u64; 8];
    let mut region = region(&mut buf);
    let block = Block::at(16);

    block.write_tag(&mut region, Tag::allocated(32));

    assert_eq!(block.read_tag(&region), Tag::allocated(32));
    assert_eq!(block.read_footer(&region), Tag::allocated(32));

    block.write_tag(&mut region, Tag::free(48));
    assert_eq!(block.read_footer(&region), Tag::free(48));
    assert_eq!(region.read(16 + 48 - WORD), Tag::free(48).word());
  }

  #[test]
  fn test_neighbours_by_address() {
    let mut buf = [0u64; 8];
    let mut region = region(&mut buf);
    let first = Block::at(0);
    let second = Block::at(16);
    let third = Block::at(40);

    first.write_tag(&mut region, Tag::free(16));
    second.write_tag(&mut region, Tag::allocated(24));
    third.write_tag(&mut region, Tag::free(24));

    assert_eq!(first.following(&region), Some(second));
    assert_eq!(second.following(&region), Some(third));
    assert_eq!(third.following(&region), None);

    assert_eq!(third.preceding(&region), Some(second));
    assert_eq!(second.preceding(&region), Some(first));
    assert_eq!(first.preceding(&region), None);

    let walked: Vec<_> = physical(&region).map(|b| b.offset()).collect();
    assert_eq!(walked, vec![0, 16, 40]);
  }

  #[test]
  fn test_payload_round_trip() {
    let mut buf = [0u64; 8];
    let mut region = region(&mut buf);
    let block = Block::at(16);
    block.write_tag(&mut region, Tag::allocated(48));

    let payload = block.payload(&region);
    assert_eq!(payload.as_ptr() as usize % crate::align::ALIGNMENT, 0);
    assert_eq!(payload.as_ptr() as usize - region.base().as_ptr() as usize, 24);
    assert_eq!(Block::from_payload(&region, payload), block);
    assert_eq!(block.capacity(&region), 36);
    assert!(region.contains(payload.as_ptr()));
    assert!(!region.contains(region.end()));
  }

  #[test]
  fn test_links() {
    let mut buf = [0u64; 4];
    let mut region = region(&mut buf);
    let block = Block::at(0);

    block.set_next(&mut region, Block::at(96));
    block.set_prev(&mut region, Block::at(208));

    assert_eq!(block.next(&region), Block::at(96));
    assert_eq!(block.prev(&region), Block::at(208));
  }
}
