// Absolute byte-counter pairs and the reconciliation baseline

use serde::{Deserialize, Serialize};

/// One raw reading of a pair of absolute byte counters. Used for network
/// rx/tx and (on cumulative platforms) disk read/write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCounterPair {
    pub rx: u64,
    pub tx: u64,
}

/// Last observed absolute counters plus the interface they belong to.
/// Owned by whoever reconciles; reset only on process restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterState {
    pub counters: RawCounterPair,
    pub interface: String,
}

impl CounterState {
    pub fn new(rx: u64, tx: u64, interface: impl Into<String>) -> Self {
        Self {
            counters: RawCounterPair { rx, tx },
            interface: interface.into(),
        }
    }
}

/// Per-interval deltas computed from two successive absolute readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDelta {
    pub rx: u64,
    pub tx: u64,
}

/// Disk I/O reading. On Linux these are cumulative bytes since boot; on
/// platforms whose probe reports a formatted rate they are bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskIo {
    pub read: u64,
    pub write: u64,
}

impl DiskIo {
    /// View as a counter pair for reconciliation (read maps to rx).
    pub fn as_pair(&self) -> RawCounterPair {
        RawCounterPair {
            rx: self.read,
            tx: self.write,
        }
    }
}
