// Network usage readings and the two fixed persisted network rows

use serde::{Deserialize, Serialize};

/// Current absolute counters for the default interface, straight from the
/// probe. Counters are totals since interface creation and may wrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkUsage {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
}

/// Row in the `network` table. Row id 1 holds the lifetime total (monotonic
/// non-decreasing); row id 2 holds the last observed raw absolute counters,
/// the reconciliation baseline across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    pub id: i64,
    pub time: i64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub interface: String,
}

/// Id of the lifetime-total row.
pub const NETWORK_ROW_TOTAL: i64 = 1;
/// Id of the last-observed-baseline row.
pub const NETWORK_ROW_BASELINE: i64 = 2;
