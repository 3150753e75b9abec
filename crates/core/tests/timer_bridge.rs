//! Behavior tests for the timer bridge, run on tokio's paused clock.

use portico_core::HostBuilder;
use portico_core::timer::TimerCallback;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn counter_callback(counter: &Arc<AtomicUsize>) -> TimerCallback {
    let counter = Arc::clone(counter);
    Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

fn recording_callback(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> TimerCallback {
    let log = Arc::clone(log);
    Arc::new(move || {
        log.lock().unwrap().push(tag);
    })
}

/// Give the scheduler task a chance to process commands and fires.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn zero_delay_timeout_never_fires_synchronously() {
    let host = HostBuilder::new().build();
    let mut scope = host.create_scope();
    let fired = Arc::new(AtomicUsize::new(0));

    scope.set_timeout(counter_callback(&fired), Duration::ZERO);
    // `set_timeout` returned; the callback must not have run yet.
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    assert!(scope.pump_one().await);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_before_tick_suppresses_the_callback() {
    let host = HostBuilder::new().build();
    let mut scope = host.create_scope();
    let fired = Arc::new(AtomicUsize::new(0));

    let handle = scope.set_timeout(counter_callback(&fired), Duration::from_millis(10));
    scope.clear_timeout(&handle);

    tokio::time::sleep(Duration::from_millis(50)).await;
    settle().await;
    assert_eq!(scope.pump_timers(), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_after_delivery_skips_the_pending_fire() {
    let host = HostBuilder::new().build();
    let mut scope = host.create_scope();
    let fired = Arc::new(AtomicUsize::new(0));

    let handle = scope.set_immediate(counter_callback(&fired));
    tokio::time::sleep(Duration::from_millis(1)).await;
    settle().await;

    // The fire is already sitting in the inbox; cancelling must still win.
    handle.cancel();
    assert_eq!(scope.pump_timers(), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn timers_due_together_fire_in_scheduling_order() {
    let host = HostBuilder::new().build();
    let mut scope = host.create_scope();
    let log = Arc::new(Mutex::new(Vec::new()));

    scope.set_timeout(recording_callback(&log, "a"), Duration::from_millis(5));
    scope.set_timeout(recording_callback(&log, "b"), Duration::from_millis(5));
    scope.set_timeout(recording_callback(&log, "c"), Duration::from_millis(5));

    tokio::time::sleep(Duration::from_millis(10)).await;
    settle().await;
    assert_eq!(scope.pump_timers(), 3);
    assert_eq!(*log.lock().unwrap(), ["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn one_shot_fires_at_most_once() {
    let host = HostBuilder::new().build();
    let mut scope = host.create_scope();
    let fired = Arc::new(AtomicUsize::new(0));

    let handle = scope.set_timeout(counter_callback(&fired), Duration::from_millis(5));
    tokio::time::sleep(Duration::from_millis(50)).await;
    settle().await;
    scope.pump_timers();
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // Cancelling a fired one-shot is a safe no-op, twice over.
    handle.cancel();
    handle.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;
    settle().await;
    assert_eq!(scope.pump_timers(), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn interval_fires_until_cancelled() {
    let host = HostBuilder::new().build();
    let mut scope = host.create_scope();
    let fired = Arc::new(AtomicUsize::new(0));

    let handle = scope.set_interval(counter_callback(&fired), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(35)).await;
    settle().await;
    scope.pump_timers();
    assert_eq!(fired.load(Ordering::SeqCst), 3);

    scope.clear_interval(&handle);
    tokio::time::sleep(Duration::from_millis(50)).await;
    settle().await;
    assert_eq!(scope.pump_timers(), 0);
    assert_eq!(fired.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn scope_teardown_cancels_owned_timers_but_not_process_timers() {
    let host = HostBuilder::new().build();
    let scope_fired = Arc::new(AtomicUsize::new(0));
    let process_fired = Arc::new(AtomicUsize::new(0));

    let scope = host.create_scope();
    scope.set_interval(counter_callback(&scope_fired), Duration::from_millis(10));
    // Process-wide timer registered from within the scope's lifetime.
    host.set_process_interval(counter_callback(&process_fired), Duration::from_millis(10));

    drop(scope);
    settle().await;
    tokio::time::sleep(Duration::from_millis(45)).await;
    settle().await;

    assert!(host.pump_process_timers() >= 4);
    assert!(process_fired.load(Ordering::SeqCst) >= 4);
    assert_eq!(scope_fired.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn set_immediate_is_a_zero_delay_one_shot() {
    let host = HostBuilder::new().build();
    let mut scope = host.create_scope();
    let log = Arc::new(Mutex::new(Vec::new()));

    scope.set_timeout(recording_callback(&log, "later"), Duration::from_millis(5));
    scope.set_immediate(recording_callback(&log, "now"));

    tokio::time::sleep(Duration::from_millis(10)).await;
    settle().await;
    assert_eq!(scope.pump_timers(), 2);
    assert_eq!(*log.lock().unwrap(), ["now", "later"]);
}
