// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Health is public; everything else
// requires a valid Bearer token checked via the `AuthBearer` extractor.
//
// The handlers are thin: they snapshot the session store, call the pure
// stage functions, and apply the returned deltas. CORS is permissive for
// development.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::auth::AuthBearer;
use crate::app_state::AppState;
use crate::decision::{build_plan, execute_plan};
use crate::error::EngineError;
use crate::portfolio::valuation;
use crate::scan::{run_market_scan, run_news_pull};
use crate::session::InputKind;
use crate::stages::classify::triage_new;
use crate::stages::coupling::detect;
use crate::stages::intake::{build_entry, now_stamp};
use crate::stages::rooms::allocate;
use crate::types::TradingMode;

/// Frames a single tracker-step request may advance.
const MAX_FRAMES_PER_STEP: u32 = 100;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/intake", post(intake))
        .route("/api/v1/scan", post(scan))
        .route("/api/v1/scan/latest", get(scan_latest))
        .route("/api/v1/news/pull", post(news_pull))
        .route("/api/v1/rooms/allocate", post(rooms_allocate))
        .route("/api/v1/couplings/recompute", post(couplings_recompute))
        .route("/api/v1/plan", get(plan_preview))
        .route("/api/v1/plan/execute", post(plan_execute))
        .route("/api/v1/portfolio", get(portfolio))
        .route("/api/v1/tracker/step", post(tracker_step))
        .route("/api/v1/tracker/objects", get(tracker_objects))
        .route("/api/v1/control/pause", post(control_pause))
        .route("/api/v1/control/resume", post(control_resume))
        .route("/api/v1/control/kill", post(control_kill))
        // ── Middleware & state ──────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Full state snapshot
// =============================================================================

async fn full_state(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

// =============================================================================
// Intake
// =============================================================================

#[derive(Deserialize)]
struct IntakeRequest {
    text: String,
    /// "text" (default) or "file".
    #[serde(default)]
    kind: Option<String>,
}

async fn intake(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(req): Json<IntakeRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let kind = match req.kind.as_deref() {
        Some("file") => InputKind::File,
        _ => InputKind::Text,
    };

    let entry = build_entry(kind, req.text, None, None).map_err(bad_request)?;
    let tx_code = entry.tx_code.clone();
    state.store.append_intake(entry);
    state.increment_version();

    info!(tx_code = %tx_code, "intake accepted");
    Ok(Json(serde_json::json!({ "tx_code": tx_code })))
}

// =============================================================================
// Scan & news
// =============================================================================

async fn scan(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let outcome = run_market_scan(&state).await;
    Json(outcome)
}

async fn scan_latest(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.last_scan_snapshot())
}

async fn news_pull(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let outcome = run_news_pull(&state).await;
    Json(outcome)
}

// =============================================================================
// Desk stages
// =============================================================================

/// Triage anything new, then house every triaged entry without a room.
async fn rooms_allocate(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let intake = state.store.intake_snapshot();
    let triage = state.store.triage_snapshot();

    let new_triage = triage_new(&intake, &triage);
    let triaged_codes: Vec<String> = new_triage.iter().map(|t| t.tx_code.clone()).collect();
    state.store.mark_triaged(&triaged_codes);
    state.store.append_triage(new_triage);

    let triage = state.store.triage_snapshot();
    let rooms = state.store.rooms_snapshot();
    let new_rooms = allocate(&triage, &intake, &rooms);
    let housed = new_rooms.len();
    state.store.append_rooms(new_rooms);
    state.increment_version();

    info!(triaged = triaged_codes.len(), housed, "rooms allocated");
    Json(serde_json::json!({ "triaged": triaged_codes.len(), "housed": housed }))
}

async fn couplings_recompute(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rooms = state.store.rooms_snapshot();
    let edges = detect(&rooms);
    let count = edges.len();
    state.store.replace_couplings(edges);
    state.increment_version();

    info!(couplings = count, "couplings recomputed");
    Json(serde_json::json!({ "couplings": count }))
}

// =============================================================================
// Plan & execution
// =============================================================================

async fn plan_preview(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let plan = build_plan(
        &state.store.last_scan_snapshot(),
        &state.store.couplings_snapshot(),
        &state.store.intake_snapshot(),
        &state.store.rooms_snapshot(),
        &state.runtime_config.read().risk,
    );
    Json(plan)
}

async fn plan_execute(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    {
        let mode = state.runtime_config.read().trading_mode;
        if mode == TradingMode::Killed {
            return Err(bad_request(EngineError::invalid(
                "engine is killed; restart required",
            )));
        }
    }

    let risk = state.runtime_config.read().risk.clone();
    let plan = build_plan(
        &state.store.last_scan_snapshot(),
        &state.store.couplings_snapshot(),
        &state.store.intake_snapshot(),
        &state.store.rooms_snapshot(),
        &risk,
    );

    // Resolve prices for rows the scan could not price.
    let history_days = state.runtime_config.read().history_days;
    let mut prices: HashMap<String, f64> = HashMap::new();
    for row in plan.iter().filter(|r| r.price.is_none()) {
        match state.history.daily(&row.ticker, history_days).await {
            Ok(series) => {
                if let Some(px) = series.last_close() {
                    prices.insert(row.ticker.clone(), px);
                }
            }
            Err(e) => {
                warn!(ticker = %row.ticker, error = %e, "no live price for plan row");
                state.push_error(format!("execute: {e}"));
            }
        }
    }

    let holdings = state.store.holdings_snapshot();
    let outcome = execute_plan(&plan, holdings, &risk, &prices, &now_stamp());

    state.store.replace_holdings(outcome.holdings.clone());
    state.store.append_trades(outcome.trades.clone());
    state.increment_version();

    Ok(Json(serde_json::json!({
        "actions_applied": outcome.actions_applied,
        "rows_skipped": outcome.rows_skipped,
        "open_positions": outcome.holdings.len(),
    })))
}

// =============================================================================
// Portfolio
// =============================================================================

async fn portfolio(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Mark holdings against the latest scan prices; tickers the scan did not
    // cover simply report no live value.
    let prices: HashMap<String, f64> = state
        .store
        .last_scan_snapshot()
        .into_iter()
        .filter(|r| r.snapshot.price.is_finite() && r.snapshot.price > 0.0)
        .map(|r| (r.ticker, r.snapshot.price))
        .collect();

    let holdings = state.store.holdings_snapshot();
    let value = valuation(&holdings, &prices);
    Json(serde_json::json!({
        "valuation": value,
        "trades": state.store.trades_snapshot(),
    }))
}

// =============================================================================
// Tracker
// =============================================================================

#[derive(Deserialize)]
struct TrackerStepRequest {
    #[serde(default)]
    frames: Option<u32>,
}

async fn tracker_step(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(req): Json<TrackerStepRequest>,
) -> impl IntoResponse {
    let frames = req.frames.unwrap_or(1).clamp(1, MAX_FRAMES_PER_STEP);

    // One lock for the whole batch: frames are strictly sequential.
    let mut tracker = state.tracker.lock();
    let mut last = None;
    for _ in 0..frames {
        last = Some(tracker.step());
    }
    drop(tracker);
    state.increment_version();

    Json(serde_json::json!({ "frames": frames, "last": last }))
}

async fn tracker_objects(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let tracker = state.tracker.lock();
    Json(serde_json::json!({
        "frame": tracker.frame(),
        "objects": tracker.objects(),
        "recent_events": tracker.recent_events(),
    }))
}

// =============================================================================
// Control endpoints
// =============================================================================

#[derive(Serialize)]
struct ControlResponse {
    trading_mode: String,
    message: String,
}

async fn control_pause(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    set_mode(&state, TradingMode::Paused);
    info!("engine PAUSED via API");
    Json(ControlResponse {
        trading_mode: "Paused".to_string(),
        message: "Scan loop paused".to_string(),
    })
}

async fn control_resume(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    set_mode(&state, TradingMode::Live);
    info!("engine RESUMED via API");
    Json(ControlResponse {
        trading_mode: "Live".to_string(),
        message: "Scan loop live".to_string(),
    })
}

async fn control_kill(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    set_mode(&state, TradingMode::Killed);
    warn!("engine KILLED via API");
    Json(ControlResponse {
        trading_mode: "Killed".to_string(),
        message: "Engine killed — manual restart required".to_string(),
    })
}

fn set_mode(state: &AppState, mode: TradingMode) {
    state.runtime_config.write().trading_mode = mode;
    state.increment_version();
}

// =============================================================================
// Helpers
// =============================================================================

fn bad_request(e: EngineError) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": e.to_string() })),
    )
}
