use std::{io::Read, ptr};

use tagalloc::{Heap, HeapError, Sbrk};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `gdb`,
/// or just visually track how the program break moves.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break = {:?}",
    label,
    std::process::id(),
    Sbrk::program_break(),
  );
}

fn print_blocks(heap: &Heap<Sbrk>) {
  println!("    offset      size  allocated");
  for block in heap.blocks() {
    println!("{:>10}{:>10}{:>11}", block.offset, block.size, block.allocated);
  }
  println!("    heap size: {}, free: {}", heap.heap_size(), heap.free_bytes());
}

fn main() -> Result<(), HeapError> {
  // RUST_LOG=trace shows every search, split and merge.
  env_logger::init();

  print_program_break("start");
  let mut heap = Heap::init(Sbrk::new())?;
  print_program_break("after init");
  print_blocks(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) First allocation misses the empty free list and grows the arena by
  //    twice the block: a free block in front, ours behind it.
  // --------------------------------------------------------------------
  let a = heap.allocate(100)?;
  println!("\n[1] allocate(100) = {:?}", a);
  print_program_break("after allocate(100)");
  print_blocks(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) A second, bigger allocation does not fit the free front and grows
  //    again.
  // --------------------------------------------------------------------
  let b = heap.allocate(200)?;
  unsafe { ptr::write_bytes(b.as_ptr(), 0xAB, 200) };
  println!("\n[2] allocate(200) = {:?}, filled with 0xAB", b);
  print_blocks(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Freeing `a` merges it with the free blocks on both sides.
  // --------------------------------------------------------------------
  unsafe { heap.deallocate(a) };
  println!("\n[3] deallocate({:?})", a);
  print_blocks(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) A smaller request is carved out of the merged block; the break does
  //    not move.
  // --------------------------------------------------------------------
  let c = heap.allocate(90)?;
  println!("\n[4] allocate(90) = {:?}", c);
  print_program_break("after allocate(90)");
  print_blocks(&heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Resize moves `b` and keeps its contents.
  // --------------------------------------------------------------------
  let b = unsafe { heap.resize(b, 1000)? };
  let first = unsafe { b.as_ptr().read() };
  println!("\n[5] resize(b, 1000) = {:?}, first byte = {:#X}", b, first);
  print_blocks(&heap);

  if let Err(corruption) = heap.check() {
    println!("heap corrupted: {corruption}");
  }

  println!("\n[6] End of example. The OS reclaims the arena when the process exits.");
  Ok(())
}
