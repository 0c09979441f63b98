// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_is_after_2020() {
    // 2020-01-01T00:00:00Z
    assert!(SystemClock.now_ms() > 1_577_836_800_000);
}

#[test]
fn manual_clock_advances() {
    let clock = ManualClock::new(1000);
    assert_eq!(clock.now_ms(), 1000);

    clock.advance(250);
    assert_eq!(clock.now_ms(), 1250);

    clock.set(5);
    assert_eq!(clock.now_ms(), 5);
}

#[test]
fn manual_clock_clones_share_time() {
    let clock = ManualClock::new(0);
    let handle = clock.clone();

    handle.advance(42);
    assert_eq!(clock.now_ms(), 42);
}

#[test]
fn clock_source_by_reference() {
    let clock = ManualClock::new(7);
    let borrowed: &ManualClock = &clock;
    assert_eq!(ClockSource::now_ms(&borrowed), 7);
}
