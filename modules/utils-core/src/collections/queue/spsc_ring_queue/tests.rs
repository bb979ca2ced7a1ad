use alloc::{sync::Arc, vec::Vec};

use super::SpscRingQueue;
use crate::collections::queue::SpscQueue;

#[test]
fn capacity_rounds_up_to_power_of_two() {
  let queue = SpscRingQueue::<u32>::with_capacity(100);
  assert_eq!(queue.capacity(), Some(128));
}

#[test]
fn offer_then_poll_is_fifo() {
  let queue = SpscRingQueue::with_capacity(8);
  for value in 0..5_u32 {
    queue.offer(value).expect("offer");
  }
  assert_eq!(queue.len(), 5);
  for expected in 0..5_u32 {
    assert_eq!(queue.poll(), Some(expected));
  }
  assert!(queue.is_empty());
  assert_eq!(queue.poll(), None);
}

#[test]
fn full_queue_hands_the_value_back() {
  let queue = SpscRingQueue::with_capacity(2);
  queue.offer(1_u32).expect("offer");
  queue.offer(2_u32).expect("offer");
  assert_eq!(queue.offer(3), Err(3));
  assert_eq!(queue.poll(), Some(1));
  queue.offer(3).expect("offer after poll");
}

#[test]
fn cursors_wrap_around() {
  let queue = SpscRingQueue::with_capacity(4);
  for round in 0..100_u32 {
    queue.offer(round).expect("offer");
    assert_eq!(queue.poll(), Some(round));
  }
  assert!(queue.is_empty());
}

#[test]
fn clear_with_drains_into_sink() {
  let queue = SpscRingQueue::with_capacity(8);
  for value in 0..3_u32 {
    queue.offer(value).expect("offer");
  }
  let mut drained = Vec::new();
  queue.clear_with(&mut |value| drained.push(value));
  assert_eq!(drained, [0, 1, 2]);
  assert!(queue.is_empty());
}

#[test]
fn values_cross_threads_in_order() {
  let queue = Arc::new(SpscRingQueue::with_capacity(16));
  let producer = queue.clone();
  let handle = std::thread::spawn(move || {
    for value in 0..1000_u32 {
      loop {
        if producer.offer(value).is_ok() {
          break;
        }
        std::thread::yield_now();
      }
    }
  });
  let mut received = 0_u32;
  while received < 1000 {
    if let Some(value) = queue.poll() {
      assert_eq!(value, received);
      received += 1;
    } else {
      std::thread::yield_now();
    }
  }
  handle.join().expect("join");
}
