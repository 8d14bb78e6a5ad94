// Network lifetime-total sampler. Reconciles successive absolute rx/tx
// counters against the persisted baseline (network row id 2) and advances
// the lifetime totals (row id 1), which never decrease.

use crate::metrics_repo::{MetricsRepo, now_ms};
use crate::models::{CounterState, NETWORK_ROW_BASELINE, NETWORK_ROW_TOTAL, RawCounterPair};
use crate::probe::MetricsProbe;
use crate::reconcile::{apply_delta, reconcile};
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::Instrument;

pub struct NetStatSamplerDeps {
    pub probe: Arc<dyn MetricsProbe>,
    pub metrics_repo: Arc<MetricsRepo>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

pub struct NetStatSamplerConfig {
    pub network_interval_secs: u64,
}

pub fn spawn(deps: NetStatSamplerDeps, config: NetStatSamplerConfig) -> tokio::task::JoinHandle<()> {
    let NetStatSamplerDeps {
        probe,
        metrics_repo,
        mut shutdown_rx,
    } = deps;

    let span = tracing::span!(
        tracing::Level::DEBUG,
        "netstat_sampler",
        interval_secs = config.network_interval_secs
    );

    tokio::spawn(
        async move {
            // The persisted baseline carries reconciliation across restarts.
            // Without it lifetime accounting is meaningless, so its absence is
            // surfaced loudly and the sampler stays idle.
            let mut baseline = match metrics_repo.get_network_row(NETWORK_ROW_BASELINE).await {
                Ok(Some(row)) => CounterState::new(row.rx_bytes, row.tx_bytes, row.interface),
                Ok(None) => {
                    tracing::error!(
                        operation = "get_network_row",
                        "network baseline row missing; lifetime totals will not be recorded"
                    );
                    return;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        operation = "get_network_row",
                        "network baseline unreadable; lifetime totals will not be recorded"
                    );
                    return;
                }
            };

            let mut tick = interval(Duration::from_secs(config.network_interval_secs));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        if let Err(e) = sample_once(&*probe, &metrics_repo, &mut baseline).await {
                            tracing::warn!(
                                error = %e,
                                operation = "sample_network",
                                "network sample failed; skipping tick"
                            );
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Network sampler shutting down");
                        break;
                    }
                }
            }
        }
        .instrument(span),
    )
}

/// One sampling step: probe, reconcile, persist total + new baseline.
/// The in-memory baseline only advances after both rows are written, so a
/// store failure is retried against the same baseline next tick.
pub async fn sample_once(
    probe: &dyn MetricsProbe,
    metrics_repo: &MetricsRepo,
    baseline: &mut CounterState,
) -> anyhow::Result<()> {
    let usage = probe.network_usage().await?;
    let current = RawCounterPair {
        rx: usage.rx_bytes,
        tx: usage.tx_bytes,
    };
    let (delta, next) = reconcile(baseline, current);

    let total_row = metrics_repo
        .get_network_row(NETWORK_ROW_TOTAL)
        .await?
        .ok_or_else(|| anyhow::anyhow!("network total row missing"))?;
    let total_rx = apply_delta(total_row.rx_bytes, delta.rx);
    let total_tx = apply_delta(total_row.tx_bytes, delta.tx);

    let time = now_ms();
    metrics_repo
        .update_network_row(NETWORK_ROW_TOTAL, total_rx, total_tx, &usage.interface, time)
        .await?;
    metrics_repo
        .update_network_row(
            NETWORK_ROW_BASELINE,
            usage.rx_bytes,
            usage.tx_bytes,
            &usage.interface,
            time,
        )
        .await?;

    *baseline = CounterState {
        counters: next.counters,
        interface: usage.interface,
    };
    Ok(())
}
