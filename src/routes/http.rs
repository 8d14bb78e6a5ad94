// GET handlers: version, host info, persisted history reads

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use super::AppState;
use crate::metrics_repo::{LoadTable, now_ms};
use crate::models::NETWORK_ROW_TOTAL;
use crate::version::{NAME, VERSION};

/// GET /version — service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/info — static host identity (fetched once at startup).
pub(super) async fn api_info_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(state.host_info.as_ref().clone())
}

#[derive(Debug, Deserialize)]
pub(super) struct LoadsQuery {
    family: String,
    from: Option<i64>,
    to: Option<i64>,
}

/// GET /api/history/loads?family=cpu|memory&from=<ms>&to=<ms> — persisted
/// load aggregates in range, ascending.
pub(super) async fn history_loads_handler(
    State(state): State<AppState>,
    Query(query): Query<LoadsQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let table = match query.family.as_str() {
        "cpu" => LoadTable::Cpu,
        // The dashboard says "ram", the table is named "memory"; accept both.
        "memory" | "ram" => LoadTable::Memory,
        _ => return Err(StatusCode::BAD_REQUEST),
    };
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or_else(now_ms);
    let records = state
        .metrics_repo
        .get_loads(table, from, to)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, operation = "get_loads", "history read failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(axum::Json(records))
}

/// GET /api/history/network — the lifetime-total row.
pub(super) async fn history_network_handler(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    let row = state
        .metrics_repo
        .get_network_row(NETWORK_ROW_TOTAL)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, operation = "get_network_row", "network history read failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(axum::Json(row))
}
