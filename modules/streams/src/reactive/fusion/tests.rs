use super::FusionMode;

#[test]
fn any_contains_both_fused_modes() {
  assert!(FusionMode::ANY.contains(FusionMode::SYNC));
  assert!(FusionMode::ANY.contains(FusionMode::ASYNC));
  assert!(!FusionMode::SYNC.contains(FusionMode::ASYNC));
}

#[test]
fn thread_barrier_blocks_grants() {
  let request = FusionMode::ANY.union(FusionMode::THREAD_BARRIER);
  assert!(!request.allows_sync());
  assert!(!request.allows_async());
  assert!(FusionMode::ANY.allows_sync());
}

#[test]
fn without_removes_bits() {
  let mask = FusionMode::ANY.without(FusionMode::SYNC);
  assert_eq!(mask, FusionMode::ASYNC);
  assert!(FusionMode::NONE.is_none());
}
