use super::QueueFactory;

#[test]
fn capacity_one_maps_to_one_slot() {
  let queue = QueueFactory::for_capacity::<u32>(1);
  assert_eq!(queue.capacity(), Some(1));
}

#[test]
fn moderate_capacity_maps_to_bounded_ring() {
  let queue = QueueFactory::for_capacity::<u32>(256);
  assert_eq!(queue.capacity(), Some(256));
}

#[test]
fn huge_capacity_maps_to_unbounded() {
  let queue = QueueFactory::for_capacity::<u32>(QueueFactory::UNBOUNDED_THRESHOLD + 1);
  assert_eq!(queue.capacity(), None);
}

#[test]
fn explicit_constructors_match_keying() {
  assert_eq!(QueueFactory::one::<u32>().capacity(), Some(1));
  assert_eq!(QueueFactory::unbounded::<u32>().capacity(), None);
}
