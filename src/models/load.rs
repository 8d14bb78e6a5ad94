// CPU/RAM load readings, persisted load rows and per-family push payloads

use serde::{Deserialize, Serialize};

/// Metric family a client can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Cpu,
    Ram,
    Disk,
    Network,
}

impl Family {
    /// Parse the `part` string from a client command. Unknown or missing
    /// parts fall back to the full-load payload, so this returns Option.
    pub fn from_part(part: Option<&str>) -> Option<Family> {
        match part {
            Some("cpu") => Some(Family::Cpu),
            Some("ram") => Some(Family::Ram),
            Some("disk") => Some(Family::Disk),
            Some("network") => Some(Family::Network),
            _ => None,
        }
    }
}

/// Instantaneous probe reading: CPU load fraction plus RAM usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReading {
    /// Fraction in [0, 1].
    pub cpu_load: f64,
    pub ram_used_mb: f64,
    pub ram_total_mb: f64,
    /// Fraction in [0, 1].
    pub ram_load: f64,
}

/// Mean over one accumulation window, ready to persist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadAverage {
    pub cpu_load: f64,
    pub ram_load: f64,
}

/// One persisted aggregate row in the cpu/memory tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRecord {
    pub time: i64,
    pub load: f64,
}

/// Family-specific payload pushed to a streaming session.
/// Superseded by the next sample; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricSnapshot {
    #[serde(rename_all = "camelCase")]
    Network { upload: u64, download: u64, ping: f64 },
    #[serde(rename_all = "camelCase")]
    Disk { read: f64, write: f64 },
    #[serde(rename_all = "camelCase")]
    Full {
        cpu_load: f64,
        ram_used_mb: f64,
        ram_total_mb: f64,
        ram_load: f64,
    },
    #[serde(rename_all = "camelCase")]
    Ram {
        ram_used_mb: f64,
        ram_total_mb: f64,
        ram_load: f64,
    },
    #[serde(rename_all = "camelCase")]
    Cpu { cpu_load: f64 },
}

impl MetricSnapshot {
    /// Project a full load reading onto the payload for one family.
    /// Disk and network payloads are not derived from load readings.
    pub fn from_reading(family: Option<Family>, reading: &LoadReading) -> MetricSnapshot {
        match family {
            Some(Family::Cpu) => MetricSnapshot::Cpu {
                cpu_load: reading.cpu_load,
            },
            Some(Family::Ram) => MetricSnapshot::Ram {
                ram_used_mb: reading.ram_used_mb,
                ram_total_mb: reading.ram_total_mb,
                ram_load: reading.ram_load,
            },
            _ => MetricSnapshot::Full {
                cpu_load: reading.cpu_load,
                ram_used_mb: reading.ram_used_mb,
                ram_total_mb: reading.ram_total_mb,
                ram_load: reading.ram_load,
            },
        }
    }
}
