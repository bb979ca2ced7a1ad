use super::Context;

#[test]
fn empty_context_has_no_entries() {
  let context = Context::empty();
  assert!(context.is_empty());
  assert!(context.get::<u32>("missing").is_none());
}

#[test]
fn put_returns_a_new_context() {
  let base = Context::empty();
  let derived = base.put("answer", 42_u32);
  assert!(base.get::<u32>("answer").is_none());
  assert_eq!(derived.get::<u32>("answer").as_deref(), Some(&42));
}

#[test]
fn later_entries_shadow_earlier_ones() {
  let context = Context::empty().put("key", 1_u32).put("key", 2_u32);
  assert_eq!(context.get::<u32>("key").as_deref(), Some(&2));
}

#[test]
fn lookup_is_type_checked() {
  let context = Context::empty().put("key", 1_u32);
  assert!(context.get::<i64>("key").is_none());
  assert!(context.contains("key"));
}
