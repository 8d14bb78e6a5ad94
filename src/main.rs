use anyhow::Result;
use hostmon::probe::MetricsProbe;
use hostmon::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let probe: Arc<dyn probe::MetricsProbe> = Arc::new(probe::SysinfoProbe::new());
    let host_info = Arc::new(
        probe
            .host_info()
            .await
            .map_err(|e| anyhow::anyhow!("host info: {}", e))?,
    );
    let metrics_repo = Arc::new(
        metrics_repo::MetricsRepo::connect(
            &app_config.database.path,
            app_config.database.retention_days,
        )
        .await?,
    );
    metrics_repo.init().await?;

    let latest = Arc::new(sampler::LatestLoad::new());
    let registry = Arc::new(sessions::SessionRegistry::new());
    let identity: Arc<dyn sessions::IdentityResolver> = Arc::new(sessions::TokenIdentity);

    let (load_shutdown_tx, load_shutdown_rx) = tokio::sync::oneshot::channel();
    let load_handle = sampler::spawn(
        sampler::LoadSamplerDeps {
            probe: probe.clone(),
            metrics_repo: metrics_repo.clone(),
            latest: latest.clone(),
            shutdown_rx: load_shutdown_rx,
        },
        sampler::LoadSamplerConfig {
            load_interval_ms: app_config.sampling.load_interval_ms,
            window_size: app_config.sampling.window_size,
        },
    );

    let (net_shutdown_tx, net_shutdown_rx) = tokio::sync::oneshot::channel();
    let net_handle = netstat::spawn(
        netstat::NetStatSamplerDeps {
            probe: probe.clone(),
            metrics_repo: metrics_repo.clone(),
            shutdown_rx: net_shutdown_rx,
        },
        netstat::NetStatSamplerConfig {
            network_interval_secs: app_config.sampling.network_interval_secs,
        },
    );

    let app = routes::app(
        probe,
        metrics_repo,
        latest,
        registry,
        identity,
        host_info,
        app_config.clone(),
    );
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let in_container = std::path::Path::new("/.dockerenv").exists()
        || std::env::var("CONTAINER").as_deref() == Ok("1");

    if in_container {
        // In Docker: run server until error or SIGTERM (no signal handler; avoids immediate exit)
        axum::serve(listener, app).await?;
    } else {
        tokio::select! {
            result = axum::serve(listener, app) => {
                result?;
            }
            _ = async {
                #[cfg(unix)]
                {
                    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                        Ok(s) => s,
                        Err(_) => {
                            let _ = tokio::signal::ctrl_c().await;
                            return;
                        }
                    };
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                #[cfg(not(unix))]
                {
                    tokio::signal::ctrl_c().await
                }
            } => {
                tracing::info!("Received shutdown signal");
                let _ = load_shutdown_tx.send(());
                let _ = net_shutdown_tx.send(());
                let _ = load_handle.await;
                let _ = net_handle.await;
            }
        }
    }

    Ok(())
}
