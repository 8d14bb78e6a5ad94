// Shared test helpers: a scriptable fake probe and config/repo builders

#![allow(dead_code)]

use futures_util::future::BoxFuture;
use hostmon::models::{DiskIo, HostInfo, LoadReading, NetworkUsage, ProcessInfo, ProcessList};
use hostmon::probe::{MetricsProbe, ProbeError, ProbeResult};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Probe whose readings are plain shared state the test mutates directly.
pub struct FakeProbe {
    pub load: Mutex<LoadReading>,
    pub rx_bytes: AtomicU64,
    pub tx_bytes: AtomicU64,
    pub disk_read: AtomicU64,
    pub disk_write: AtomicU64,
    pub ping_ms: Mutex<f64>,
    pub fail_load: AtomicBool,
    pub fail_network: AtomicBool,
    /// Artificial latency for `network_usage`, to simulate a slow poll.
    pub network_delay_ms: AtomicU64,
    /// Number of `network_usage` calls started.
    pub network_calls: AtomicU64,
}

impl Default for FakeProbe {
    fn default() -> Self {
        Self {
            load: Mutex::new(LoadReading {
                cpu_load: 0.25,
                ram_used_mb: 2048.0,
                ram_total_mb: 8192.0,
                ram_load: 0.25,
            }),
            rx_bytes: AtomicU64::new(0),
            tx_bytes: AtomicU64::new(0),
            disk_read: AtomicU64::new(0),
            disk_write: AtomicU64::new(0),
            ping_ms: Mutex::new(12.5),
            fail_load: AtomicBool::new(false),
            fail_network: AtomicBool::new(false),
            network_delay_ms: AtomicU64::new(0),
            network_calls: AtomicU64::new(0),
        }
    }
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_load(&self, cpu_load: f64, ram_load: f64) {
        let mut guard = self.load.lock().unwrap();
        guard.cpu_load = cpu_load;
        guard.ram_load = ram_load;
    }

    pub fn set_network(&self, rx: u64, tx: u64) {
        self.rx_bytes.store(rx, Ordering::SeqCst);
        self.tx_bytes.store(tx, Ordering::SeqCst);
    }

    pub fn add_rx(&self, bytes: u64) {
        self.rx_bytes.fetch_add(bytes, Ordering::SeqCst);
    }

    pub fn set_disk(&self, read: u64, write: u64) {
        self.disk_read.store(read, Ordering::SeqCst);
        self.disk_write.store(write, Ordering::SeqCst);
    }

    pub fn set_network_delay(&self, ms: u64) {
        self.network_delay_ms.store(ms, Ordering::SeqCst);
    }

    pub fn network_calls(&self) -> u64 {
        self.network_calls.load(Ordering::SeqCst)
    }
}

fn failed(op: &str) -> ProbeError {
    ProbeError::Unavailable(format!("fake probe: {} failure injected", op))
}

impl MetricsProbe for FakeProbe {
    fn current_load(&self) -> BoxFuture<'_, ProbeResult<LoadReading>> {
        Box::pin(async move {
            if self.fail_load.load(Ordering::SeqCst) {
                return Err(failed("current_load"));
            }
            Ok(self.load.lock().unwrap().clone())
        })
    }

    fn process_list(&self) -> BoxFuture<'_, ProbeResult<ProcessList>> {
        Box::pin(async move {
            Ok(ProcessList {
                list: vec![ProcessInfo {
                    pid: 42,
                    name: "fakeproc".into(),
                    cpu: 1.5,
                    mem: 64.0,
                    user: "root".into(),
                    state: "Run".into(),
                    started: 1_700_000_000,
                }],
            })
        })
    }

    fn network_usage(&self) -> BoxFuture<'_, ProbeResult<NetworkUsage>> {
        Box::pin(async move {
            self.network_calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.network_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
            }
            if self.fail_network.load(Ordering::SeqCst) {
                return Err(failed("network_usage"));
            }
            Ok(NetworkUsage {
                interface: "eth0".into(),
                rx_bytes: self.rx_bytes.load(Ordering::SeqCst),
                tx_bytes: self.tx_bytes.load(Ordering::SeqCst),
                rx_dropped: 0,
                tx_dropped: 0,
                rx_errors: 0,
                tx_errors: 0,
            })
        })
    }

    fn disk_io(&self) -> BoxFuture<'_, ProbeResult<DiskIo>> {
        Box::pin(async move {
            Ok(DiskIo {
                read: self.disk_read.load(Ordering::SeqCst),
                write: self.disk_write.load(Ordering::SeqCst),
            })
        })
    }

    fn ping(&self, _host: String) -> BoxFuture<'_, ProbeResult<f64>> {
        Box::pin(async move { Ok(*self.ping_ms.lock().unwrap()) })
    }

    fn host_info(&self) -> BoxFuture<'_, ProbeResult<HostInfo>> {
        Box::pin(async move {
            Ok(HostInfo {
                os_family: "Linux".into(),
                os_version: "6.1".into(),
                host_name: "testbox".into(),
                processor_name: "Fake CPU".into(),
            })
        })
    }
}
