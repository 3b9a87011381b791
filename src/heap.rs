use std::ptr::{self, NonNull};

use log::{debug, trace, warn};

use crate::{
  align::{ALIGNMENT, checked_align},
  arena::Grow,
  block::{self, Block, BlockInfo, OVERHEAD, Region, Tag},
  check,
  coalesce::{self, Coalesced},
  config::{Growth, HeapConfig},
  error::{HeapCorruption, HeapError},
  free_list, search, split,
};

/// A boundary-tag heap over a growable arena.
///
/// Creating a `Heap` lays down the sentinel, so no operation can run on an
/// uninitialised arena. The heap is single-threaded: every operation takes
/// `&mut self` and callers sharing one across threads must serialise access
/// themselves.
pub struct Heap<G: Grow> {
  arena: G,
  region: Region,
  config: HeapConfig,
}

impl<G: Grow> Heap<G> {
  /// Establishes the sentinel with the default configuration.
  pub fn init(arena: G) -> Result<Self, HeapError> {
    Self::with_config(arena, HeapConfig::default())
  }

  pub fn with_config(
    mut arena: G,
    config: HeapConfig,
  ) -> Result<Self, HeapError> {
    let base = arena
      .grow(OVERHEAD)
      .ok_or(HeapError::ArenaExhausted { requested: OVERHEAD })?;
    debug_assert_eq!(base.as_ptr() as usize % ALIGNMENT, 0, "arena base must be aligned");

    let mut region = unsafe { Region::new(base, OVERHEAD) };
    free_list::init(&mut region);

    debug!("heap initialised at {base:?} with {config:?}");
    Ok(Self {
      arena,
      region,
      config,
    })
  }

  /// Allocates at least `size` bytes, 8-byte aligned.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let needed = block_size(size)?;

    let block = match search::first_fit(&self.region, needed, self.config.search_limit) {
      Some(block) => {
        split::split(&mut self.region, block, needed);
        block
      }
      None => self.grow(needed, self.config.allocate_growth)?,
    };

    trace!("allocate({size}) -> block {} of {}", block.offset(), block.size(&self.region));
    self.debug_check();
    Ok(block.payload(&self.region))
  }

  /// Returns the block behind `ptr` to the heap.
  ///
  /// # Safety
  ///
  /// `ptr` must come from [`allocate`](Self::allocate) or
  /// [`resize`](Self::resize) on this heap and must not have been
  /// deallocated since.
  pub unsafe fn deallocate(
    &mut self,
    ptr: NonNull<u8>,
  ) {
    let block = self.owned_block(ptr);
    let size = block.size(&self.region);
    block.write_tag(&mut self.region, Tag::free(size));

    match coalesce::coalesce(&mut self.region, block) {
      Coalesced::IntoPreceding(into) => {
        trace!("deallocate({}) merged into {}", block.offset(), into.offset());
      }
      Coalesced::Unlinked(block) => {
        free_list::insert_after_sentinel(&mut self.region, block);
        trace!("deallocate({}) listed {} bytes", block.offset(), block.size(&self.region));
      }
    }

    self.debug_check();
  }

  /// Moves the allocation behind `ptr` into a block of at least `size`
  /// bytes, preserving the first `min(size, capacity)` bytes.
  ///
  /// The data always moves: the new block is found or grown while the old
  /// one is still allocated, and the old one is freed after the copy. On
  /// error nothing changes and `ptr` stays valid.
  ///
  /// # Safety
  ///
  /// Same contract on `ptr` as [`deallocate`](Self::deallocate).
  pub unsafe fn resize(
    &mut self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let needed = block_size(size)?;
    let old = self.owned_block(ptr);
    let copy_len = old.capacity(&self.region).min(size);

    let block = match search::first_fit(&self.region, needed, self.config.search_limit) {
      Some(block) => {
        split::split(&mut self.region, block, needed);
        block
      }
      None => self.grow(needed, self.config.resize_growth)?,
    };

    let new = block.payload(&self.region);
    unsafe {
      ptr::copy_nonoverlapping(ptr.as_ptr(), new.as_ptr(), copy_len);
      self.deallocate(ptr);
    }

    trace!("resize({}, {size}) -> block {}", old.offset(), block.offset());
    Ok(new)
  }

  /// Extends the arena for a `needed`-byte block and carves it out.
  ///
  /// Nothing is written unless the arena grew.
  fn grow(
    &mut self,
    needed: u32,
    growth: Growth,
  ) -> Result<Block, HeapError> {
    let bytes = needed as usize * growth.factor();
    let exhausted = HeapError::ArenaExhausted { requested: bytes };

    // Every block offset has to fit a link word.
    if self.region.len() + bytes > u32::MAX as usize {
      warn!("heap: growing {} by {bytes} would overflow block offsets", self.region.len());
      return Err(exhausted);
    }

    let Some(start) = self.arena.grow(bytes) else {
      warn!("heap: arena refused to grow by {bytes}");
      return Err(exhausted);
    };
    debug_assert_eq!(start.as_ptr().cast_const(), self.region.end(), "arena grew non-contiguously");

    let offset = self.region.len() as u32;
    unsafe { self.region.extend(bytes) };
    debug!("heap: grew by {bytes} to {}", self.region.len());

    match growth {
      Growth::Exact => {
        let block = Block::at(offset);
        block.write_tag(&mut self.region, Tag::allocated(needed));
        Ok(block)
      }
      Growth::Double => {
        let front = Block::at(offset);
        let block = Block::at(offset + needed);
        front.write_tag(&mut self.region, Tag::free(needed));
        block.write_tag(&mut self.region, Tag::allocated(needed));

        if coalesce::merge_backward(&mut self.region, front).is_none() {
          free_list::insert_after_sentinel(&mut self.region, front);
        }
        Ok(block)
      }
    }
  }

  fn owned_block(
    &self,
    ptr: NonNull<u8>,
  ) -> Block {
    debug_assert!(self.region.contains(ptr.as_ptr()), "{ptr:?} is not inside the arena");
    debug_assert_eq!(ptr.as_ptr() as usize % ALIGNMENT, 0, "{ptr:?} is not a payload pointer");

    let block = Block::from_payload(&self.region, ptr);

    debug_assert!(block.is_allocated(&self.region), "{ptr:?} is not allocated");
    debug_assert_eq!(
      block.read_tag(&self.region),
      block.read_footer(&self.region),
      "{ptr:?} has a corrupted boundary tag"
    );
    block
  }

  fn debug_check(&self) {
    if cfg!(feature = "paranoid") {
      debug_assert_eq!(self.check(), Ok(()));
    }
  }

  /// Verifies every structural invariant of the heap.
  pub fn check(&self) -> Result<(), HeapCorruption> {
    check::check(&self.region)
  }

  pub fn arena(&self) -> &G {
    &self.arena
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  /// First byte of the arena, which is the sentinel's header.
  pub fn arena_low(&self) -> NonNull<u8> {
    self.region.base()
  }

  /// Last byte of the arena.
  pub fn arena_high(&self) -> *const u8 {
    self.region.end().wrapping_sub(1)
  }

  /// Bytes the heap has taken from the arena.
  pub fn heap_size(&self) -> usize {
    self.region.len()
  }

  /// Every block in address order, sentinel first.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    block::physical(&self.region).map(|block| block.info(&self.region))
  }

  /// Free blocks in free-list order, sentinel excluded.
  pub fn free_blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    free_list::iter(&self.region).map(|block| block.info(&self.region))
  }

  /// Total size of all free blocks, overhead included.
  pub fn free_bytes(&self) -> usize {
    self.free_blocks().map(|info| info.size).sum()
  }

  /// Usable bytes in the allocation behind `ptr`.
  ///
  /// # Safety
  ///
  /// Same contract on `ptr` as [`deallocate`](Self::deallocate).
  pub unsafe fn payload_capacity(
    &self,
    ptr: NonNull<u8>,
  ) -> usize {
    self.owned_block(ptr).capacity(&self.region)
  }
}

/// Total block size for a `size`-byte payload.
fn block_size(size: usize) -> Result<u32, HeapError> {
  size
    .checked_add(OVERHEAD)
    .and_then(checked_align)
    .and_then(|total| u32::try_from(total).ok())
    .ok_or(HeapError::ArenaExhausted { requested: size })
}
