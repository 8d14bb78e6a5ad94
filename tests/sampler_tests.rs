// Load sampler tests: window boundary, latest slot, flush + discard semantics

mod common;

use common::FakeProbe;
use hostmon::metrics_repo::{LoadTable, MetricsRepo, now_ms};
use hostmon::models::{Family, LoadReading, MetricSnapshot};
use hostmon::sampler::{LatestLoad, LoadSamplerConfig, LoadSamplerDeps, LoadWindow, spawn};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tempfile::TempDir;

fn reading(cpu_load: f64, ram_load: f64) -> LoadReading {
    LoadReading {
        cpu_load,
        ram_used_mb: 1024.0,
        ram_total_mb: 4096.0,
        ram_load,
    }
}

#[test]
fn window_flushes_exactly_at_capacity_with_arithmetic_mean() {
    let mut window = LoadWindow::new(60);
    let mut flushed = None;
    for i in 1..=60 {
        let v = i as f64 / 10.0; // 0.1, 0.2, ..., 6.0
        let result = window.record(reading(v, v / 10.0));
        if i < 60 {
            assert!(result.is_none(), "flushed early at sample {}", i);
        } else {
            flushed = result;
        }
    }
    let average = flushed.expect("window must flush on the 60th sample");
    // mean of 0.1..=6.0 is 3.05
    assert!((average.cpu_load - 3.05).abs() < 1e-9);
    assert!((average.ram_load - 0.305).abs() < 1e-9);
    assert!(window.is_empty(), "container must be empty right after flush");
}

#[test]
fn window_accumulates_again_after_flush() {
    let mut window = LoadWindow::new(2);
    assert!(window.record(reading(0.2, 0.2)).is_none());
    assert!(window.record(reading(0.4, 0.4)).is_some());
    assert!(window.record(reading(1.0, 1.0)).is_none());
    assert_eq!(window.len(), 1);
}

#[test]
fn latest_slot_projects_by_family() {
    let latest = LatestLoad::new();
    assert!(latest.latest(Some(Family::Cpu)).is_none());

    latest.store(reading(0.5, 0.25));
    assert_eq!(
        latest.latest(Some(Family::Cpu)),
        Some(MetricSnapshot::Cpu { cpu_load: 0.5 })
    );
    assert_eq!(
        latest.latest(Some(Family::Ram)),
        Some(MetricSnapshot::Ram {
            ram_used_mb: 1024.0,
            ram_total_mb: 4096.0,
            ram_load: 0.25,
        })
    );
    // Unknown family falls back to the full payload
    assert_eq!(
        latest.latest(None),
        Some(MetricSnapshot::Full {
            cpu_load: 0.5,
            ram_used_mb: 1024.0,
            ram_total_mb: 4096.0,
            ram_load: 0.25,
        })
    );

    // Overwritten wholesale by the next sample
    latest.store(reading(0.9, 0.75));
    assert_eq!(
        latest.latest(Some(Family::Cpu)),
        Some(MetricSnapshot::Cpu { cpu_load: 0.9 })
    );
}

async fn test_repo() -> (TempDir, Arc<MetricsRepo>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.db");
    let repo = Arc::new(
        MetricsRepo::connect(path.to_str().unwrap(), 7)
            .await
            .unwrap(),
    );
    repo.init().await.unwrap();
    (dir, repo)
}

#[tokio::test]
async fn sampler_flushes_aggregates_and_updates_latest() {
    let (_dir, repo) = test_repo().await;
    let probe = Arc::new(FakeProbe::new());
    probe.set_load(0.5, 0.25);
    let latest = Arc::new(LatestLoad::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = spawn(
        LoadSamplerDeps {
            probe: probe.clone(),
            metrics_repo: repo.clone(),
            latest: latest.clone(),
            shutdown_rx,
        },
        LoadSamplerConfig {
            load_interval_ms: 10,
            window_size: 3,
        },
    );

    tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;
    let _ = shutdown_tx.send(());
    handle.await.unwrap();

    assert!(latest.latest(None).is_some());
    let cpu = repo.get_loads(LoadTable::Cpu, 0, now_ms()).await.unwrap();
    assert!(!cpu.is_empty(), "at least one cpu aggregate flushed");
    assert!((cpu[0].load - 0.5).abs() < 1e-9);
    let memory = repo.get_loads(LoadTable::Memory, 0, now_ms()).await.unwrap();
    assert!(!memory.is_empty(), "at least one memory aggregate flushed");
    assert!((memory[0].load - 0.25).abs() < 1e-9);
}

#[tokio::test]
async fn sampler_discards_partial_window_on_shutdown() {
    let (_dir, repo) = test_repo().await;
    let probe = Arc::new(FakeProbe::new());
    let latest = Arc::new(LatestLoad::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = spawn(
        LoadSamplerDeps {
            probe: probe.clone(),
            metrics_repo: repo.clone(),
            latest,
            shutdown_rx,
        },
        LoadSamplerConfig {
            load_interval_ms: 10,
            window_size: 10_000,
        },
    );

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    let _ = shutdown_tx.send(());
    handle.await.unwrap();

    let cpu = repo.get_loads(LoadTable::Cpu, 0, now_ms()).await.unwrap();
    assert!(cpu.is_empty(), "partial windows are never persisted");
}

#[tokio::test]
async fn sampler_survives_probe_failures() {
    let (_dir, repo) = test_repo().await;
    let probe = Arc::new(FakeProbe::new());
    probe.fail_load.store(true, Ordering::SeqCst);
    let latest = Arc::new(LatestLoad::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = spawn(
        LoadSamplerDeps {
            probe: probe.clone(),
            metrics_repo: repo,
            latest: latest.clone(),
            shutdown_rx,
        },
        LoadSamplerConfig {
            load_interval_ms: 10,
            window_size: 1000,
        },
    );

    tokio::time::sleep(tokio::time::Duration::from_millis(60)).await;
    assert!(latest.latest(None).is_none(), "no sample while probe fails");

    // Probe recovers; sampling resumes on the next tick
    probe.fail_load.store(false, Ordering::SeqCst);
    tokio::time::sleep(tokio::time::Duration::from_millis(60)).await;
    assert!(latest.latest(None).is_some());

    let _ = shutdown_tx.send(());
    handle.await.unwrap();
}
