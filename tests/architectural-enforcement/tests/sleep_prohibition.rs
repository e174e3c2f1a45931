//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT sleep. Every timed behaviour
//! (state expiry, sleep-after-idle, animation) is driven by the tick
//! interval and explicit clocks.
//! **Exceptions**: test code.

use architectural_enforcement::{report, scan_dir};

const SLEEP_CALLS: [&str; 3] = ["::sleep(", ".sleep(", "sleep_until("];

#[test]
fn test_no_sleep_in_core() {
    report(
        "Sleep calls in companion-core production code",
        &scan_dir("companion/core/src", &SLEEP_CALLS),
    );
}

#[test]
fn test_no_sleep_in_daemon() {
    report(
        "Sleep calls in companion-daemon production code",
        &scan_dir("companion/daemon/src", &SLEEP_CALLS),
    );
}
