// Linux-specific helpers: /proc/diskstats, /proc/cpuinfo.

use crate::models::RawCounterPair;
use crate::probe::ProbeError;

/// Cumulative disk read/write bytes since boot, summed over whole disks
/// (entries of /sys/block, so partitions are not double counted).
/// Sector counts in /proc/diskstats are always 512-byte units.
pub(super) fn read_disk_io() -> Result<RawCounterPair, ProbeError> {
    #[cfg(target_os = "linux")]
    {
        let disks: std::collections::HashSet<String> = std::fs::read_dir("/sys/block")?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with("loop") && !name.starts_with("ram"))
            .collect();

        let content = std::fs::read_to_string("/proc/diskstats")?;
        let mut read_bytes: u64 = 0;
        let mut write_bytes: u64 = 0;
        for line in content.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            // major minor name reads ... sectors_read(5) ... sectors_written(9)
            if fields.len() < 10 || !disks.contains(fields[2]) {
                continue;
            }
            let sectors_read: u64 = fields[5].parse().unwrap_or(0);
            let sectors_written: u64 = fields[9].parse().unwrap_or(0);
            read_bytes = read_bytes.saturating_add(sectors_read.saturating_mul(512));
            write_bytes = write_bytes.saturating_add(sectors_written.saturating_mul(512));
        }
        Ok(RawCounterPair {
            rx: read_bytes,
            tx: write_bytes,
        })
    }
    #[cfg(not(target_os = "linux"))]
    {
        Err(ProbeError::Unavailable(
            "disk I/O counters not supported on this platform".into(),
        ))
    }
}

/// Read first "model name" from /proc/cpuinfo. Prefer over sysinfo when it
/// returns "cpu0" etc.
pub(super) fn read_cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/cpuinfo").ok()?;
        for line in content.lines() {
            if line.starts_with("model name") {
                let name = line
                    .find(": ")
                    .map(|i| line[i + 2..].trim())
                    .filter(|s| !s.is_empty() && *s != "cpu0")?;
                return Some(name.to_string());
            }
        }
    }
    None
}
