//! Sleep-overshoot calibration.
//!
//! The OS sleep primitive reliably overshoots the requested duration by a platform- and
//! load-dependent amount. [`Link`](super::Link) measures this once at open and subtracts it from
//! every subsequent pre-send delay so the actual inter-frame gap tracks
//! [`ETH_PACKET_DELAY_US`](super::ETH_PACKET_DELAY_US) rather than that plus overshoot.

use std::time::{Duration, Instant};

const CALIBRATION_ITERATIONS: u32 = 1000;

/// Sleep `target` repeatedly and return the mean overshoot, in microseconds, as a signed value
/// (it is expected to be positive, but callers should not assume that).
pub fn calibrate_sleep_bias(target: Duration) -> i64 {
    let mut total = Duration::ZERO;

    for _ in 0..CALIBRATION_ITERATIONS {
        let start = Instant::now();
        std::thread::sleep(target);
        total += start.elapsed();
    }

    let mean_us = total.as_micros() / CALIBRATION_ITERATIONS as u128;

    mean_us as i64 - target.as_micros() as i64
}
