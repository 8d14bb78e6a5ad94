// Streaming session: WebSocket handler and per-session push dispatcher.
//
// One task per connection multiplexes inbound commands, the per-session
// poll timer, keepalive pings and the registry eviction signal. Polls run
// inline in the loop, so two polls for one session are never in flight at
// once; with skipped ticks a slow poll delays the next push instead of
// piling up.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use serde::Deserialize;
use tokio::time::{Duration, Instant, interval_at, timeout};

use super::AppState;
use crate::models::{CounterState, Family, MetricSnapshot, RawCounterPair};
use crate::reconcile::reconcile;
use crate::sessions::clamp_cadence;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub(super) struct StreamQuery {
    token: Option<String>,
    part: Option<String>,
    timer: Option<u64>,
}

pub(super) async fn ws_stream(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let identity = query
            .token
            .as_deref()
            .and_then(|token| state.identity.resolve(token));
        let Some(identity) = identity else {
            tracing::info!("Stream client rejected: unauthenticated");
            let mut socket = socket;
            let _ = socket.send(Message::Close(None)).await;
            return;
        };
        if let Err(e) = run_session(socket, state, identity, query.part, query.timer).await {
            tracing::info!("Stream session error: {}", e);
        }
    })
}

/// Per-session mutable state: requested family/cadence plus the baselines
/// for delta-producing families. Owned by the session task; no sharing.
struct SessionState {
    part: Option<String>,
    cadence_secs: u64,
    last_net: Option<CounterState>,
    last_disk: Option<CounterState>,
}

async fn run_session(
    mut socket: WebSocket,
    state: AppState,
    identity: String,
    part: Option<String>,
    timer: Option<u64>,
) -> anyhow::Result<()> {
    let ticket = state.registry.register(&identity);
    let mut evicted_rx = ticket.evicted_rx;
    tracing::info!(identity = %identity, session = ticket.id, "Stream client connected");

    let min_cadence = state.config.streaming.min_cadence_secs;
    let mut session = SessionState {
        part,
        cadence_secs: clamp_cadence(timer, min_cadence),
        last_net: None,
        last_disk: None,
    };

    // None while stopped; replaced wholesale on every start (cancel-then-arm).
    let mut poll_tick: Option<tokio::time::Interval> = None;
    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut evicted = false;
    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<crate::models::ClientCommand>(&text) {
                            Ok(cmd) => match cmd.action {
                                crate::models::ClientAction::Start => {
                                    if cmd.part.is_some() {
                                        session.part = cmd.part;
                                    }
                                    if cmd.timer.is_some() {
                                        session.cadence_secs = clamp_cadence(cmd.timer, min_cadence);
                                    }
                                    if !poll_and_push(&mut socket, &state, &mut session).await {
                                        break;
                                    }
                                    let period = Duration::from_secs(session.cadence_secs);
                                    let mut tick = interval_at(Instant::now() + period, period);
                                    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                                    poll_tick = Some(tick);
                                }
                                crate::models::ClientAction::Stop => {
                                    poll_tick = None;
                                }
                            },
                            // Malformed command: ignored, no reply.
                            Err(_) => {}
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
            _ = async {
                match poll_tick.as_mut() {
                    Some(tick) => { tick.tick().await; }
                    None => std::future::pending().await,
                }
            } => {
                if !poll_and_push(&mut socket, &state, &mut session).await {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
            _ = &mut evicted_rx => {
                tracing::info!(identity = %identity, session = ticket.id, "Session closed by newer login");
                let _ = socket.send(Message::Close(None)).await;
                evicted = true;
                break;
            }
        }
    }

    // An evicted session's slot already belongs to its successor.
    if !evicted {
        state.registry.deregister(&identity, ticket.id);
    }
    tracing::info!(identity = %identity, session = ticket.id, "Stream client disconnected");
    Ok(())
}

/// Run one poll and push the result. Returns false when the transport is
/// gone; a probe failure just skips the push and keeps the session alive.
async fn poll_and_push(
    socket: &mut WebSocket,
    state: &AppState,
    session: &mut SessionState,
) -> bool {
    let Some(data) = poll_once(state, session).await else {
        return true;
    };
    let frame = serde_json::json!({ "type": "data", "data": data });
    let json = match serde_json::to_string(&frame) {
        Ok(j) => j,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode push frame");
            return true;
        }
    };
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    !(r.is_err() || r.unwrap_or(Ok(())).is_err())
}

/// One poll by family. None means "no data this tick" (already logged).
async fn poll_once(state: &AppState, session: &mut SessionState) -> Option<serde_json::Value> {
    match Family::from_part(session.part.as_deref()) {
        Some(Family::Network) => poll_network(state, session).await,
        Some(Family::Cpu) | Some(Family::Ram) => poll_load(state, session).await,
        Some(Family::Disk) => poll_disk(state, session).await,
        None => {
            let snapshot = state.latest.latest(None)?;
            to_value(&snapshot)
        }
    }
}

/// Interval upload/download against this session's own baseline, plus
/// latency. The first poll establishes the baseline with zero deltas.
async fn poll_network(state: &AppState, session: &mut SessionState) -> Option<serde_json::Value> {
    let ping_host = state.config.streaming.ping_host.clone();
    let (usage, ping) = tokio::join!(state.probe.network_usage(), state.probe.ping(ping_host));
    let usage = match usage {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!(error = %e, operation = "network_usage", "poll skipped");
            return None;
        }
    };
    let ping = match ping {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, operation = "ping", "poll skipped");
            return None;
        }
    };

    let current = RawCounterPair {
        rx: usage.rx_bytes,
        tx: usage.tx_bytes,
    };
    let (upload, download) = match &session.last_net {
        Some(baseline) => {
            let (delta, _) = reconcile(baseline, current);
            (delta.tx, delta.rx)
        }
        None => (0, 0),
    };
    session.last_net = Some(CounterState {
        counters: current,
        interface: usage.interface,
    });

    to_value(&MetricSnapshot::Network {
        upload,
        download,
        ping,
    })
}

/// Latest sampler snapshot for cpu/ram merged with the current process list.
async fn poll_load(state: &AppState, session: &mut SessionState) -> Option<serde_json::Value> {
    let family = Family::from_part(session.part.as_deref());
    let snapshot = match state.latest.latest(family) {
        Some(s) => s,
        None => {
            tracing::debug!("no load sample completed yet; poll skipped");
            return None;
        }
    };
    let processes = match state.probe.process_list().await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, operation = "process_list", "poll skipped");
            return None;
        }
    };

    let mut data = to_value(&snapshot)?;
    if let serde_json::Value::Object(map) = &mut data {
        map.insert("processes".into(), to_value(&processes)?);
    }
    Some(data)
}

/// Disk read/write rates. Platforms whose probe already reports a formatted
/// per-second rate (Windows in the original stack) get a single scaled
/// read; cumulative-counter platforms reconcile two successive reads
/// separated by the session cadence and report bits per second.
async fn poll_disk(state: &AppState, session: &mut SessionState) -> Option<serde_json::Value> {
    let io = match state.probe.disk_io().await {
        Ok(io) => io,
        Err(e) => {
            tracing::warn!(error = %e, operation = "disk_io", "poll skipped");
            return None;
        }
    };

    let snapshot = if cfg!(windows) {
        MetricSnapshot::Disk {
            read: (io.read as f64 / 1024.0).ceil(),
            write: (io.write as f64 / 1024.0).ceil(),
        }
    } else {
        match &session.last_disk {
            Some(baseline) => {
                let (delta, next) = reconcile(baseline, io.as_pair());
                session.last_disk = Some(next);
                let cadence = session.cadence_secs.max(1) as f64;
                MetricSnapshot::Disk {
                    read: delta.rx as f64 * 8.0 / cadence,
                    write: delta.tx as f64 * 8.0 / cadence,
                }
            }
            None => {
                session.last_disk = Some(CounterState {
                    counters: io.as_pair(),
                    interface: String::new(),
                });
                MetricSnapshot::Disk {
                    read: 0.0,
                    write: 0.0,
                }
            }
        }
    };
    to_value(&snapshot)
}

fn to_value<T: serde::Serialize>(value: &T) -> Option<serde_json::Value> {
    match serde_json::to_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode payload");
            None
        }
    }
}
