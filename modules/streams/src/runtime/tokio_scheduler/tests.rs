use alloc::{boxed::Box, sync::Arc};
use core::time::Duration;
use std::sync::mpsc;

use crate::reactive::{Scheduler, SchedulerError};
use super::TokioScheduler;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn immediate_tasks_run() {
  let scheduler = TokioScheduler::current().expect("scheduler");
  let (sender, receiver) = mpsc::channel();
  scheduler.schedule(Box::new(move || sender.send(42_u32).expect("send"))).expect("schedule");
  let value = tokio::task::spawn_blocking(move || receiver.recv_timeout(Duration::from_secs(2)))
    .await
    .expect("join")
    .expect("recv");
  assert_eq!(value, 42);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delayed_tasks_wait_for_the_delay() {
  let scheduler = TokioScheduler::current().expect("scheduler");
  let (sender, receiver) = mpsc::channel();
  let before = scheduler.now();
  scheduler
    .schedule_delayed(Box::new(move || sender.send(()).expect("send")), Duration::from_millis(30))
    .expect("schedule");
  tokio::task::spawn_blocking(move || receiver.recv_timeout(Duration::from_secs(2)))
    .await
    .expect("join")
    .expect("recv");
  assert!(scheduler.now() - before >= Duration::from_millis(25));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn periodic_tasks_repeat_until_disposed() {
  let scheduler = TokioScheduler::current().expect("scheduler");
  let (sender, receiver) = mpsc::channel();
  let task: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
    let _ = sender.send(());
  });
  let handle = scheduler
    .schedule_periodic(task, Duration::from_millis(5), Duration::from_millis(5))
    .expect("schedule");
  let ticks = tokio::task::spawn_blocking(move || {
    let mut ticks = 0;
    while ticks < 3 {
      receiver.recv_timeout(Duration::from_secs(2)).expect("tick");
      ticks += 1;
    }
    ticks
  })
  .await
  .expect("join");
  handle.dispose();
  assert_eq!(ticks, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disposed_schedulers_reject_work() {
  let scheduler = TokioScheduler::current().expect("scheduler");
  scheduler.dispose();
  assert!(scheduler.is_disposed());
  let outcome = scheduler.schedule(Box::new(|| {}));
  assert!(matches!(outcome.err(), Some(SchedulerError::Rejected)));
}
