// CPU+RAM load sampler (same loop shape as the network sampler in netstat.rs).
// Samples the probe on a fixed cadence, keeps the latest reading available
// for streaming sessions, and flushes a windowed mean to the store.

use crate::metrics_repo::{LoadTable, MetricsRepo, now_ms};
use crate::models::{Family, LoadAverage, LoadReading, MetricSnapshot};
use crate::probe::MetricsProbe;
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::Instrument;

/// Most recent probe reading, shared with streaming sessions. Overwritten on
/// every sampler tick; no depth beyond "most recent".
#[derive(Default)]
pub struct LatestLoad {
    slot: std::sync::Mutex<Option<LoadReading>>,
}

impl LatestLoad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, reading: LoadReading) {
        if let Ok(mut guard) = self.slot.lock() {
            *guard = Some(reading);
        }
    }

    /// Latest payload for one family, or None before the first sample.
    pub fn latest(&self, family: Option<Family>) -> Option<MetricSnapshot> {
        let guard = self.slot.lock().ok()?;
        guard
            .as_ref()
            .map(|reading| MetricSnapshot::from_reading(family, reading))
    }
}

/// In-memory accumulation window. Pure so the boundary behavior is testable
/// without timers: `record` returns the mean exactly when the window fills,
/// and the container is empty again afterwards.
pub struct LoadWindow {
    samples: Vec<LoadReading>,
    capacity: usize,
}

impl LoadWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn record(&mut self, reading: LoadReading) -> Option<LoadAverage> {
        self.samples.push(reading);
        if self.samples.len() < self.capacity {
            return None;
        }
        let n = self.samples.len() as f64;
        let average = LoadAverage {
            cpu_load: self.samples.iter().map(|r| r.cpu_load).sum::<f64>() / n,
            ram_load: self.samples.iter().map(|r| r.ram_load).sum::<f64>() / n,
        };
        self.samples.clear();
        Some(average)
    }
}

pub struct LoadSamplerDeps {
    pub probe: Arc<dyn MetricsProbe>,
    pub metrics_repo: Arc<MetricsRepo>,
    pub latest: Arc<LatestLoad>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

pub struct LoadSamplerConfig {
    pub load_interval_ms: u64,
    pub window_size: u32,
}

/// Round to two decimals, matching the stored aggregate precision.
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn spawn(deps: LoadSamplerDeps, config: LoadSamplerConfig) -> tokio::task::JoinHandle<()> {
    let LoadSamplerDeps {
        probe,
        metrics_repo,
        latest,
        mut shutdown_rx,
    } = deps;

    let span = tracing::span!(
        tracing::Level::DEBUG,
        "load_sampler",
        interval_ms = config.load_interval_ms
    );

    tokio::spawn(
        async move {
            let mut tick = interval(Duration::from_millis(config.load_interval_ms));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut window = LoadWindow::new(config.window_size as usize);

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let reading = match probe.current_load().await {
                            Ok(r) => r,
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    operation = "current_load",
                                    "load probe failed; retrying next tick"
                                );
                                continue;
                            }
                        };
                        latest.store(reading.clone());
                        if let Some(average) = window.record(reading) {
                            flush_average(&metrics_repo, average).await;
                        }
                    }
                    _ = &mut shutdown_rx => {
                        // Partial windows are discarded, never persisted.
                        tracing::debug!(pending_samples = window.len(), "Load sampler shutting down");
                        break;
                    }
                }
            }
        }
        .instrument(span),
    )
}

/// Persist one windowed mean per family, then sweep expired rows.
/// Store failures are logged and skipped; accumulation continues regardless.
async fn flush_average(metrics_repo: &MetricsRepo, average: LoadAverage) {
    let time = now_ms();
    for (table, load) in [
        (LoadTable::Cpu, average.cpu_load),
        (LoadTable::Memory, average.ram_load),
    ] {
        if let Err(e) = metrics_repo.add_load(table, time, round2(load)).await {
            tracing::warn!(
                error = %e,
                operation = "add_load",
                table = ?table,
                "failed to persist load aggregate"
            );
            return;
        }
    }
    match metrics_repo.sweep_expired_loads().await {
        Ok(deleted) if deleted > 0 => {
            tracing::debug!(operation = "sweep_expired_loads", deleted, "Old loads pruned");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(
                error = %e,
                operation = "sweep_expired_loads",
                "failed to prune old loads"
            );
        }
    }
}
