use alloc::{sync::Arc, vec::Vec};

use super::SpscLinkedQueue;
use crate::collections::queue::SpscQueue;

#[test]
fn offer_never_rejects() {
  let queue = SpscLinkedQueue::new();
  for value in 0..500_u32 {
    queue.offer(value).expect("offer");
  }
  assert_eq!(queue.len(), 500);
  assert_eq!(queue.capacity(), None);
}

#[test]
fn poll_crosses_chunk_boundaries_in_order() {
  let queue = SpscLinkedQueue::new();
  for value in 0..200_u32 {
    queue.offer(value).expect("offer");
  }
  for expected in 0..200_u32 {
    assert_eq!(queue.poll(), Some(expected));
  }
  assert_eq!(queue.poll(), None);
  assert!(queue.is_empty());
}

#[test]
fn interleaved_offer_poll_stays_fifo() {
  let queue = SpscLinkedQueue::new();
  let mut next_in = 0_u32;
  let mut next_out = 0_u32;
  for step in 0..400 {
    let burst = step % 5 + 1;
    for _ in 0..burst {
      queue.offer(next_in).expect("offer");
      next_in += 1;
    }
    for _ in 0..(burst / 2 + 1) {
      if let Some(value) = queue.poll() {
        assert_eq!(value, next_out);
        next_out += 1;
      }
    }
  }
  while let Some(value) = queue.poll() {
    assert_eq!(value, next_out);
    next_out += 1;
  }
  assert_eq!(next_in, next_out);
}

#[test]
fn clear_with_drains_every_chunk() {
  let queue = SpscLinkedQueue::new();
  for value in 0..100_u32 {
    queue.offer(value).expect("offer");
  }
  let mut drained = Vec::new();
  queue.clear_with(&mut |value| drained.push(value));
  assert_eq!(drained.len(), 100);
  assert!(queue.is_empty());
}

#[test]
fn dropping_a_non_empty_queue_releases_values() {
  let queue = SpscLinkedQueue::new();
  for value in 0..75_u32 {
    queue.offer(value).expect("offer");
  }
  drop(queue);
}

#[test]
fn values_cross_threads_in_order() {
  let queue = Arc::new(SpscLinkedQueue::new());
  let producer = queue.clone();
  let handle = std::thread::spawn(move || {
    for value in 0..5000_u32 {
      producer.offer(value).expect("offer");
    }
  });
  let mut received = 0_u32;
  while received < 5000 {
    if let Some(value) = queue.poll() {
      assert_eq!(value, received);
      received += 1;
    } else {
      std::thread::yield_now();
    }
  }
  handle.join().expect("join");
}
