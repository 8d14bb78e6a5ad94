// Process list sent alongside cpu/ram pushes

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// CPU usage percent of this process.
    pub cpu: f64,
    /// Resident memory in MB.
    pub mem: f64,
    pub user: String,
    pub state: String,
    /// Start time, seconds since the Unix epoch.
    pub started: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessList {
    pub list: Vec<ProcessInfo>,
}
