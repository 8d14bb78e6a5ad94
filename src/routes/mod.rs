// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::metrics_repo::MetricsRepo;
use crate::models::HostInfo;
use crate::probe::MetricsProbe;
use crate::sampler::LatestLoad;
use crate::sessions::{IdentityResolver, SessionRegistry};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) probe: Arc<dyn MetricsProbe>,
    pub(crate) metrics_repo: Arc<MetricsRepo>,
    pub(crate) latest: Arc<LatestLoad>,
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) identity: Arc<dyn IdentityResolver>,
    pub(crate) host_info: Arc<HostInfo>,
    pub(crate) config: AppConfig,
}

#[allow(clippy::too_many_arguments)]
pub fn app(
    probe: Arc<dyn MetricsProbe>,
    metrics_repo: Arc<MetricsRepo>,
    latest: Arc<LatestLoad>,
    registry: Arc<SessionRegistry>,
    identity: Arc<dyn IdentityResolver>,
    host_info: Arc<HostInfo>,
    config: AppConfig,
) -> Router {
    let state = AppState {
        probe,
        metrics_repo,
        latest,
        registry,
        identity,
        host_info,
        config,
    };
    Router::new()
        .route("/", get(|| async { "hostmon: live metrics streaming" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/info", get(http::api_info_handler)) // GET /api/info
        .route("/api/history/loads", get(http::history_loads_handler)) // GET /api/history/loads
        .route("/api/history/network", get(http::history_network_handler)) // GET /api/history/network
        .route("/ws", get(ws::ws_stream)) // WS /ws
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
