use std::sync::{Arc, Mutex};

use livecell::{DeliveryOptions, InlineScheduler, LiveCell};

mod common;
use common::change_watcher;

// A listener writing back into the cell must cost exactly one extra
// full pass, with every subscription at the final version afterwards.
#[test]
fn reentrant_set_runs_one_extra_pass() {
    common::init_tracing();
    let cell = LiveCell::new(InlineScheduler);
    let first_log = Arc::new(Mutex::new(Vec::new()));
    let (second, second_check) = change_watcher();

    cell.register(1, {
        let cell = cell.clone();
        let first_log = first_log.clone();
        move |value: i32| {
            first_log.lock().unwrap().push(value);
            if value == 1 {
                cell.set(2).unwrap();
            }
        }
    }, DeliveryOptions::default())
    .unwrap();
    cell.register(2, second, DeliveryOptions::default()).unwrap();

    cell.set(1).unwrap();

    // Pass one: sub 1 sees 1 and writes 2; the rest of the pass already
    // observes the newer version. Pass two settles sub 1.
    assert_eq!(*first_log.lock().unwrap(), [1, 2]);
    assert_eq!(second_check(), [2]);
    assert_eq!(cell.version(), 1);

    // Everyone is caught up: a fresh write delivers exactly once each
    cell.set(3).unwrap();
    assert_eq!(*first_log.lock().unwrap(), [1, 2, 3]);
    assert_eq!(second_check(), [3]);
}

#[test]
fn observed_versions_are_monotonic() {
    let cell = LiveCell::new(InlineScheduler);
    let (watcher, check) = change_watcher();
    cell.register(1, watcher, DeliveryOptions::default()).unwrap();

    for n in 1..=5 {
        cell.set(n).unwrap();
    }
    let seen = check();
    assert_eq!(seen, [1, 2, 3, 4, 5]);
    assert!(seen.windows(2).all(|pair| pair[0] < pair[1]));
}

// Registration from inside a callback must not corrupt the running
// pass; the newcomer is caught up by the invalidation pass.
#[test]
fn register_during_dispatch() {
    let cell = LiveCell::new(InlineScheduler);
    let (late, late_check) = change_watcher();
    let late_slot = Arc::new(Mutex::new(Some(late)));

    cell.register(1, {
        let cell = cell.clone();
        move |_: i32| {
            if let Some(listener) = late_slot.lock().unwrap().take() {
                cell.register(2, listener, DeliveryOptions::default()).unwrap();
            }
        }
    }, DeliveryOptions::default())
    .unwrap();

    cell.set(10).unwrap();
    assert_eq!(late_check(), [10]);
    assert_eq!(cell.subscription_count(), 2);

    cell.set(11).unwrap();
    assert_eq!(late_check(), [11]);
}

#[test]
fn unregister_during_dispatch() {
    let cell = LiveCell::new(InlineScheduler);
    let (victim, victim_check) = change_watcher();

    // Sub 1 removes sub 2 before the pass reaches it
    cell.register(1, {
        let cell = cell.clone();
        move |_: i32| {
            let _ = cell.unregister_id(2);
        }
    }, DeliveryOptions::default())
    .unwrap();
    cell.register(2, victim, DeliveryOptions::default()).unwrap();

    cell.set(1).unwrap();
    assert_eq!(victim_check(), [] as [i32; 0]);
    assert_eq!(cell.subscription_count(), 1);
}
