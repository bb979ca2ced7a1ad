use core::mem::align_of;

use super::CachePadded;

#[test]
fn padded_value_is_line_aligned() {
  assert!(align_of::<CachePadded<u8>>() >= 64);
}

#[test]
fn deref_reaches_inner_value() {
  let padded = CachePadded::new(42_u64);
  assert_eq!(*padded, 42);
  assert_eq!(padded.into_inner(), 42);
}
