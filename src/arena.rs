use std::ptr::{self, NonNull};

use libc::{c_void, intptr_t, sbrk};
use log::debug;

use crate::align;

/// The one primitive the heap is built on: extending the arena.
///
/// # Safety
///
/// Implementors must return regions that are contiguous with everything
/// returned before (each new region starts where the previous one ended),
/// the first one 8-byte aligned, and that stay valid for reads and writes
/// for as long as the implementor is alive.
pub unsafe trait Grow {
  /// Extends the arena by `bytes` and returns the start of the new region,
  /// or `None` when no more address space is available.
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>>;
}

/// Grows the process data segment with `sbrk(2)`.
///
/// The break is only contiguous if nothing else in the process moves it, so
/// this is meant for programs that route all dynamic allocation through one
/// heap.
#[derive(Debug, Default)]
pub struct Sbrk {
  aligned: bool,
}

impl Sbrk {
  pub fn new() -> Self {
    Self::default()
  }

  /// The current program break.
  pub fn program_break() -> *mut u8 {
    unsafe { sbrk(0) }.cast()
  }
}

unsafe impl Grow for Sbrk {
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    let increment = intptr_t::try_from(bytes).ok()?;

    unsafe {
      if !self.aligned {
        let brk = sbrk(0) as usize;
        let pad = align!(brk) - brk;
        if pad > 0 && sbrk(pad as intptr_t) == usize::MAX as *mut c_void {
          return None;
        }
        self.aligned = true;
      }

      let address = sbrk(increment);

      if address == usize::MAX as *mut c_void {
        debug!("sbrk({bytes}) failed");
        return None;
      }

      debug!("sbrk({bytes}) -> {address:?}");
      NonNull::new(address.cast())
    }
  }
}

/// A simulated arena over one buffer reserved up front.
///
/// Growth hands out the buffer front to back and fails once `capacity`
/// bytes are used, which makes exhaustion reproducible. Every call to
/// [`Grow::grow`] is counted, successful or not.
#[derive(Debug)]
pub struct FixedArena {
  start: NonNull<u64>,
  words: usize,
  size: usize,
  grow_calls: usize,
}

impl FixedArena {
  /// Twenty MiB, the classic simulated heap limit.
  pub const DEFAULT_CAPACITY: usize = 20 * (1 << 20);

  pub fn new() -> Self {
    Self::with_capacity(Self::DEFAULT_CAPACITY)
  }

  /// Reserves `capacity` bytes, rounded up to a multiple of 8.
  pub fn with_capacity(capacity: usize) -> Self {
    let words = capacity.div_ceil(8);
    let buffer: Box<[u64]> = vec![0; words].into_boxed_slice();
    let start = NonNull::from(Box::leak(buffer)).cast::<u64>();

    Self {
      start,
      words,
      size: 0,
      grow_calls: 0,
    }
  }

  /// An arena on which every non-empty `grow` fails.
  pub fn failing() -> Self {
    Self::with_capacity(0)
  }

  /// First byte of the arena.
  pub fn low(&self) -> NonNull<u8> {
    self.start.cast()
  }

  /// Last byte handed out so far.
  pub fn high(&self) -> *const u8 {
    self.low().as_ptr().wrapping_add(self.size).wrapping_sub(1)
  }

  /// Bytes handed out so far.
  pub fn size(&self) -> usize {
    self.size
  }

  pub fn capacity(&self) -> usize {
    self.words * 8
  }

  pub fn grow_calls(&self) -> usize {
    self.grow_calls
  }
}

impl Default for FixedArena {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for FixedArena {
  fn drop(&mut self) {
    let slice = ptr::slice_from_raw_parts_mut(self.start.as_ptr(), self.words);
    drop(unsafe { Box::from_raw(slice) });
  }
}

unsafe impl Grow for FixedArena {
  fn grow(
    &mut self,
    bytes: usize,
  ) -> Option<NonNull<u8>> {
    self.grow_calls += 1;

    if bytes > self.capacity() - self.size {
      debug!("fixed arena: cannot grow {} + {bytes} past {}", self.size, self.capacity());
      return None;
    }

    let start = unsafe { self.low().add(self.size) };
    self.size += bytes;

    debug!("fixed arena: grew by {bytes} to {}", self.size);
    Some(start)
  }
}
