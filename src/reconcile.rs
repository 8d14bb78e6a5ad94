// Wrap-safe counter reconciliation.
//
// OS byte counters are absolute totals that reset to near zero when the
// counter wraps or the interface is recreated. A raw subtraction across a
// reset would underflow, so a reading below the baseline is taken as the
// delta itself. Each channel is handled independently; rx can wrap on a
// tick where tx does not.

use crate::models::{CounterDelta, CounterState, RawCounterPair};

/// Convert two successive absolute readings into per-interval deltas and the
/// next baseline. Infallible; the baseline always advances to `current`.
pub fn reconcile(previous: &CounterState, current: RawCounterPair) -> (CounterDelta, CounterState) {
    let delta = CounterDelta {
        rx: channel_delta(previous.counters.rx, current.rx),
        tx: channel_delta(previous.counters.tx, current.tx),
    };
    let next = CounterState {
        counters: current,
        interface: previous.interface.clone(),
    };
    (delta, next)
}

fn channel_delta(previous: u64, current: u64) -> u64 {
    if current < previous {
        // Counter reset: the post-wrap raw value is the best delta estimate.
        current
    } else {
        current - previous
    }
}

/// Advance a lifetime total by a delta. Saturating so the persisted total
/// can never decrease, even at the u64 ceiling.
pub fn apply_delta(total: u64, delta: u64) -> u64 {
    total.saturating_add(delta)
}
