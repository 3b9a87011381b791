//! # tagalloc - A Boundary-Tag Heap Allocator
//!
//! This crate provides a **first-fit, boundary-tag heap**: `allocate`,
//! `deallocate` and `resize` over a single contiguous arena that only ever
//! grows, built on one primitive that extends the arena by N bytes
//! (`sbrk(2)` in production, a fixed buffer in tests).
//!
//! ## Overview
//!
//! ```text
//!   Arena Layout:
//!
//!   arena_low                                                  arena_high
//!   ┌──────┬─────────┬──────────────┬───────┬──────────────────────┐
//!   │ sent │  A1     │    free      │  A2   │        free          │
//!   │ 16 B │ alloc   │              │ alloc │                      │
//!   └──────┴─────────┴──────────────┴───────┴──────────────────────┘
//!      ▲                  ▲                            ▲
//!      │                  └────────────┬───────────────┘
//!      │                               │
//!   Sentinel: permanent, never     Free blocks, linked in a ring that
//!   allocated, anchors the ring    starts and ends at the sentinel
//! ```
//!
//! Blocks tile the arena with no gaps. Every block carries its size and an
//! allocated bit twice: in a header word at its start and a footer word at
//! its end. The header leads to the next block, the footer of the previous
//! block leads back to it, so both neighbours are found in O(1).
//!
//! ## Crate Structure
//!
//! ```text
//!   tagalloc
//!   ├── align      - Alignment macro (align!)
//!   ├── block      - Block handles and boundary-tag encoding (internal)
//!   ├── free_list  - Sentinel-anchored free ring (internal)
//!   ├── search     - Bounded first-fit (internal)
//!   ├── split      - Carving a free block (internal)
//!   ├── coalesce   - Merging free neighbours (internal)
//!   ├── check      - Invariant walker (internal)
//!   ├── arena      - Grow trait, Sbrk and FixedArena
//!   ├── config     - HeapConfig and Growth
//!   ├── error      - HeapError and HeapCorruption
//!   └── heap       - Heap: allocate / deallocate / resize
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tagalloc::{FixedArena, Heap};
//!
//! let mut heap = Heap::init(FixedArena::new()).unwrap();
//!
//! let ptr = heap.allocate(64).unwrap();
//! unsafe {
//!     ptr.as_ptr().write_bytes(0xAB, 64);
//!     let ptr = heap.resize(ptr, 256).unwrap();
//!     assert_eq!(*ptr.as_ptr().add(63), 0xAB);
//!     heap.deallocate(ptr);
//! }
//!
//! assert!(heap.check().is_ok());
//! ```
//!
//! ## How It Works
//!
//! A block as it sits in the arena:
//!
//! ```text
//!   Allocated:
//!   ┌────────┬───────┬───────────────────────────────┬────────┐
//!   │ size|1 │  pad  │         User Data             │ size|1 │
//!   └────────┴───────┴───────────────────────────────┴────────┘
//!            8 B     ▲
//!                    └── Pointer returned to user
//!
//!   Free:
//!   ┌────────┬───────┬───────┬───────────────────────┬────────┐
//!   │ size|0 │ next  │ prev  │         unused        │ size|0 │
//!   └────────┴───────┴───────┴───────────────────────┴────────┘
//! ```
//!
//! Sizes are multiples of 8, so bit 0 of the tag is free to hold the
//! allocated flag. Free-list links are arena offsets, not pointers.
//!
//! **Allocate** rounds `size + 16` up to 8, then scans at most 400 free
//! blocks for the first one big enough. A hit is split when the leftover can
//! still be a free block. A miss grows the arena (by 2×S by default) and
//! carves the new block out of the fresh space.
//!
//! **Deallocate** clears the flag and merges the block with a free block
//! after it, then with a free block before it, so no two free blocks are
//! ever adjacent.
//!
//! **Resize** always moves: find or grow a new block, copy, free the old one.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **No shrinking**: The arena is never returned to the OS
//! - **Trusted pointers**: Invalid or double frees are undefined behaviour
//!   (caught by debug assertions where cheap)
//! - **8-byte alignment**: Payloads are never aligned beyond 8 bytes
//! - **4 GiB arenas**: Block sizes and links are 32-bit words
//!
//! ## Safety
//!
//! `deallocate` and `resize` are `unsafe`: they trust that the pointer came
//! from the same heap and is still live.

pub mod align;
mod arena;
mod block;
mod check;
mod coalesce;
mod config;
mod error;
mod free_list;
mod heap;
mod search;
mod split;

pub use arena::{FixedArena, Grow, Sbrk};
pub use block::{BlockInfo, OVERHEAD};
pub use config::{Growth, HeapConfig};
pub use error::{HeapCorruption, HeapError};
pub use heap::Heap;
