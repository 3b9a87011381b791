/// Every block size and every payload address is a multiple of this.
pub const ALIGNMENT: usize = 8;

/// Rounds the given size up to the heap's 8-byte alignment.
///
/// # Examples
///
/// ```rust
/// use tagalloc::align;
///
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(16), 16);
/// assert_eq!(align!(0), 0);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::ALIGNMENT - 1) & !($crate::align::ALIGNMENT - 1)
  };
}

/// Like [`align!`] but returns `None` instead of wrapping on overflow.
pub fn checked_align(value: usize) -> Option<usize> {
  Some(value.checked_add(ALIGNMENT - 1)? & !(ALIGNMENT - 1))
}
