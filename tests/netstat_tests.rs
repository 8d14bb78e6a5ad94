// Network sampler tests: lifetime totals, wrap absorption, baseline handling

mod common;

use common::FakeProbe;
use hostmon::metrics_repo::MetricsRepo;
use hostmon::models::{CounterState, NETWORK_ROW_BASELINE, NETWORK_ROW_TOTAL};
use hostmon::netstat::{NetStatSamplerConfig, NetStatSamplerDeps, sample_once, spawn};
use std::sync::Arc;
use tempfile::TempDir;

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
async fn lifetime_total_accumulates_plain_deltas() {
    let (_dir, repo) = test_repo().await;
    let probe = FakeProbe::new();
    let mut baseline = CounterState::new(0, 0, "");

    probe.set_network(1000, 500);
    sample_once(&probe, &repo, &mut baseline).await.unwrap();
    probe.set_network(1600, 900);
    sample_once(&probe, &repo, &mut baseline).await.unwrap();

    let total = repo
        .get_network_row(NETWORK_ROW_TOTAL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(total.rx_bytes, 1600);
    assert_eq!(total.tx_bytes, 900);
    assert_eq!(total.interface, "eth0");

    let stored = repo
        .get_network_row(NETWORK_ROW_BASELINE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.rx_bytes, 1600);
    assert_eq!(stored.tx_bytes, 900);
    assert_eq!(baseline.counters.rx, 1600);
}

#[tokio::test]
async fn counter_wrap_adds_raw_value_and_total_never_decreases() {
    let (_dir, repo) = test_repo().await;
    let probe = FakeProbe::new();
    let mut baseline = CounterState::new(0, 0, "");

    probe.set_network(10_000, 4_000);
    sample_once(&probe, &repo, &mut baseline).await.unwrap();
    let before = repo
        .get_network_row(NETWORK_ROW_TOTAL)
        .await
        .unwrap()
        .unwrap();

    // rx counter resets (interface recreated); tx keeps growing
    probe.set_network(250, 4_500);
    sample_once(&probe, &repo, &mut baseline).await.unwrap();
    let after = repo
        .get_network_row(NETWORK_ROW_TOTAL)
        .await
        .unwrap()
        .unwrap();

    assert!(after.rx_bytes >= before.rx_bytes);
    assert_eq!(after.rx_bytes, 10_000 + 250);
    assert_eq!(after.tx_bytes, 4_500);
}

#[tokio::test]
async fn baseline_survives_restart_via_persisted_row() {
    let (_dir, repo) = test_repo().await;
    let probe = FakeProbe::new();

    let mut baseline = CounterState::new(0, 0, "");
    probe.set_network(5_000, 2_000);
    sample_once(&probe, &repo, &mut baseline).await.unwrap();

    // "Restart": rebuild the baseline from row id 2, as spawn does
    let row = repo
        .get_network_row(NETWORK_ROW_BASELINE)
        .await
        .unwrap()
        .unwrap();
    let mut baseline = CounterState::new(row.rx_bytes, row.tx_bytes, row.interface);

    probe.set_network(5_300, 2_100);
    sample_once(&probe, &repo, &mut baseline).await.unwrap();
    let total = repo
        .get_network_row(NETWORK_ROW_TOTAL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(total.rx_bytes, 5_300);
    assert_eq!(total.tx_bytes, 2_100);
}

#[tokio::test]
async fn probe_failure_keeps_baseline_for_retry() {
    let (_dir, repo) = test_repo().await;
    let probe = FakeProbe::new();
    let mut baseline = CounterState::new(100, 100, "eth0");

    probe
        .fail_network
        .store(true, std::sync::atomic::Ordering::SeqCst);
    probe.set_network(900, 900);
    assert!(sample_once(&probe, &repo, &mut baseline).await.is_err());
    assert_eq!(baseline.counters.rx, 100, "baseline unchanged on failure");

    probe
        .fail_network
        .store(false, std::sync::atomic::Ordering::SeqCst);
    sample_once(&probe, &repo, &mut baseline).await.unwrap();
    let total = repo
        .get_network_row(NETWORK_ROW_TOTAL)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(total.rx_bytes, 800);
}

#[tokio::test]
async fn sampler_exits_when_baseline_unreadable() {
    // Store never initialized: the baseline row cannot be read, which is a
    // startup-health failure for this subsystem, not a crash.
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.db");
    let repo = Arc::new(
        MetricsRepo::connect(path.to_str().unwrap(), 7)
            .await
            .unwrap(),
    );

    let (_shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = spawn(
        NetStatSamplerDeps {
            probe: Arc::new(FakeProbe::new()),
            metrics_repo: repo,
            shutdown_rx,
        },
        NetStatSamplerConfig {
            network_interval_secs: 1,
        },
    );
    tokio::time::timeout(tokio::time::Duration::from_secs(2), handle)
        .await
        .expect("sampler should exit promptly")
        .unwrap();
}
