// OS metrics probe seam. Samplers and streaming sessions talk to the
// `MetricsProbe` trait so tests can inject a fake; the real implementation
// is `SysinfoProbe` below, backed by the sysinfo crate.

mod linux;

use crate::models::{
    DiskIo, HostInfo, LoadReading, NetworkUsage, ProcessInfo, ProcessList, RawCounterPair,
};
use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use sysinfo::{Networks, ProcessesToUpdate, System};
use thiserror::Error;

/// Probe failure. Callers treat any variant as "no data this tick".
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe unavailable: {0}")]
    Unavailable(String),
    #[error("probe I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("probe task join: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// Read-only view of current OS resource usage. Every method can fail with
/// a `ProbeError` on OS-level failure; none is fatal to the caller.
pub trait MetricsProbe: Send + Sync + 'static {
    /// Instantaneous CPU and RAM load.
    fn current_load(&self) -> BoxFuture<'_, ProbeResult<LoadReading>>;
    /// Current process list.
    fn process_list(&self) -> BoxFuture<'_, ProbeResult<ProcessList>>;
    /// Absolute rx/tx byte counters for the default interface.
    fn network_usage(&self) -> BoxFuture<'_, ProbeResult<NetworkUsage>>;
    /// Disk read/write counters (cumulative on Linux, see `DiskIo`).
    fn disk_io(&self) -> BoxFuture<'_, ProbeResult<DiskIo>>;
    /// Round-trip latency to `host` in milliseconds.
    fn ping(&self, host: String) -> BoxFuture<'_, ProbeResult<f64>>;
    /// Static system identity.
    fn host_info(&self) -> BoxFuture<'_, ProbeResult<HostInfo>>;
}

pub struct SysinfoProbe {
    sys: Arc<std::sync::Mutex<System>>,
    networks: Arc<std::sync::Mutex<Networks>>,
    last_cpu_refresh: Arc<std::sync::Mutex<Option<(Instant, f64)>>>,
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let networks = Networks::new_with_refreshed_list();
        Self {
            sys: Arc::new(std::sync::Mutex::new(sys)),
            networks: Arc::new(std::sync::Mutex::new(networks)),
            last_cpu_refresh: Arc::new(std::sync::Mutex::new(None)),
        }
    }
}

fn lock_err(what: &str) -> ProbeError {
    ProbeError::Unavailable(format!("{} lock poisoned", what))
}

impl MetricsProbe for SysinfoProbe {
    fn current_load(&self) -> BoxFuture<'_, ProbeResult<LoadReading>> {
        let sys = self.sys.clone();
        let last_cpu_refresh = self.last_cpu_refresh.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let mut sys = sys.lock().map_err(|_| lock_err("sysinfo"))?;
                sys.refresh_memory();

                // sysinfo needs a minimum gap between CPU refreshes to
                // compute usage; cache the last value in between.
                let now = Instant::now();
                let mut guard = last_cpu_refresh.lock().map_err(|_| lock_err("cpu cache"))?;
                let usage_percent = match *guard {
                    Some((prev_ts, prev_usage))
                        if now.duration_since(prev_ts) < sysinfo::MINIMUM_CPU_UPDATE_INTERVAL =>
                    {
                        prev_usage
                    }
                    Some(_) => {
                        sys.refresh_cpu_all();
                        let usage = sys.global_cpu_usage() as f64;
                        *guard = Some((now, usage));
                        usage
                    }
                    None => {
                        // First call establishes the baseline.
                        sys.refresh_cpu_all();
                        *guard = Some((now, 0.0));
                        0.0
                    }
                };

                let total = sys.total_memory();
                let available = sys.available_memory();
                let used = total.saturating_sub(available);
                let ram_total_mb = total as f64 / (1024.0 * 1024.0);
                let ram_used_mb = used as f64 / (1024.0 * 1024.0);
                let ram_load = if total > 0 {
                    used as f64 / total as f64
                } else {
                    0.0
                };

                Ok(LoadReading {
                    cpu_load: (usage_percent / 100.0).clamp(0.0, 1.0),
                    ram_used_mb,
                    ram_total_mb,
                    ram_load,
                })
            })
            .await?
        })
    }

    fn process_list(&self) -> BoxFuture<'_, ProbeResult<ProcessList>> {
        let sys = self.sys.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let mut sys = sys.lock().map_err(|_| lock_err("sysinfo"))?;
                sys.refresh_processes(ProcessesToUpdate::All, true);
                let list: Vec<ProcessInfo> = sys
                    .processes()
                    .values()
                    .map(|p| ProcessInfo {
                        pid: p.pid().as_u32(),
                        name: p.name().to_string_lossy().into_owned(),
                        cpu: p.cpu_usage() as f64,
                        mem: p.memory() as f64 / (1024.0 * 1024.0),
                        user: p
                            .user_id()
                            .map(|u| u.to_string())
                            .unwrap_or_default(),
                        state: p.status().to_string(),
                        started: p.start_time(),
                    })
                    .collect();
                Ok(ProcessList { list })
            })
            .await?
        })
    }

    fn network_usage(&self) -> BoxFuture<'_, ProbeResult<NetworkUsage>> {
        let networks = self.networks.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let mut networks = networks.lock().map_err(|_| lock_err("sysinfo networks"))?;
                networks.refresh(true);
                // Default interface: the busiest non-loopback one.
                let (name, data) = networks
                    .list()
                    .iter()
                    .filter(|(name, _)| !name.starts_with("lo"))
                    .max_by_key(|(_, data)| data.total_received() + data.total_transmitted())
                    .ok_or_else(|| {
                        ProbeError::Unavailable("no non-loopback network interface".into())
                    })?;
                Ok(NetworkUsage {
                    interface: name.clone(),
                    rx_bytes: data.total_received(),
                    tx_bytes: data.total_transmitted(),
                    rx_dropped: 0,
                    tx_dropped: 0,
                    rx_errors: data.total_errors_on_received(),
                    tx_errors: data.total_errors_on_transmitted(),
                })
            })
            .await?
        })
    }

    fn disk_io(&self) -> BoxFuture<'_, ProbeResult<DiskIo>> {
        Box::pin(async move {
            tokio::task::spawn_blocking(|| {
                let pair: RawCounterPair = linux::read_disk_io()?;
                Ok(DiskIo {
                    read: pair.rx,
                    write: pair.tx,
                })
            })
            .await?
        })
    }

    fn ping(&self, host: String) -> BoxFuture<'_, ProbeResult<f64>> {
        Box::pin(async move {
            // TCP connect latency to the DNS port; close enough to ICMP
            // without needing a raw socket.
            let started = Instant::now();
            let connect = tokio::net::TcpStream::connect((host.as_str(), 53));
            match tokio::time::timeout(std::time::Duration::from_secs(2), connect).await {
                Ok(Ok(_)) => Ok(started.elapsed().as_secs_f64() * 1000.0),
                Ok(Err(e)) => Err(ProbeError::Io(e)),
                Err(_) => Err(ProbeError::Unavailable(format!("ping timeout to {}", host))),
            }
        })
    }

    fn host_info(&self) -> BoxFuture<'_, ProbeResult<HostInfo>> {
        let sys = self.sys.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let sys = sys.lock().map_err(|_| lock_err("sysinfo"))?;
                let processor_name = linux::read_cpu_model()
                    .or_else(|| {
                        sys.cpus()
                            .first()
                            .map(|c| c.name().to_string())
                            .filter(|s| !s.is_empty() && s != "cpu0")
                    })
                    .unwrap_or_else(|| "Unknown".into());
                Ok(HostInfo {
                    os_family: System::name().unwrap_or_else(|| std::env::consts::OS.into()),
                    os_version: System::os_version().unwrap_or_default(),
                    host_name: System::host_name().unwrap_or_default(),
                    processor_name,
                })
            })
            .await?
        })
    }
}
