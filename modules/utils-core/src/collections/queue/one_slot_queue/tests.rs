use super::OneSlotQueue;
use crate::collections::queue::SpscQueue;

#[test]
fn holds_exactly_one_value() {
  let queue = OneSlotQueue::new();
  assert!(queue.is_empty());
  queue.offer(7_u32).expect("offer");
  assert_eq!(queue.len(), 1);
  assert_eq!(queue.offer(8), Err(8));
  assert_eq!(queue.poll(), Some(7));
  assert!(queue.is_empty());
  assert_eq!(queue.poll(), None);
}

#[test]
fn slot_is_reusable_after_poll() {
  let queue = OneSlotQueue::new();
  for value in 0..50_u32 {
    queue.offer(value).expect("offer");
    assert_eq!(queue.poll(), Some(value));
  }
}

#[test]
fn clear_with_hands_over_the_value() {
  let queue = OneSlotQueue::new();
  queue.offer(9_u32).expect("offer");
  let mut seen = None;
  queue.clear_with(&mut |value| seen = Some(value));
  assert_eq!(seen, Some(9));
  assert!(queue.is_empty());
}
