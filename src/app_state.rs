// =============================================================================
// Central Application State — Trapgate Engine
// =============================================================================
//
// Ties the subsystems together: runtime config, the session store, the
// tracker simulation, the provider clients, and the error log. All shared
// collections sit behind parking_lot locks; an atomic version counter lets
// the dashboard detect changes cheaply.
//
// The tracker sits behind a Mutex rather than an RwLock on purpose: frames
// are strictly sequential, so there is exactly one way to touch it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::providers::{HistoryClient, NewsClient};
use crate::runtime_config::RuntimeConfig;
use crate::session::{ScanRecord, SessionStore};
use crate::signal::SignalEngine;
use crate::tracker::{ProtoObject, TrackerSim};

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    /// Monotonically increasing version counter, bumped on every meaningful
    /// mutation.
    pub state_version: AtomicU64,

    pub runtime_config: Arc<RwLock<RuntimeConfig>>,
    pub store: Arc<SessionStore>,

    /// Strictly frame-sequential; see module note.
    pub tracker: Mutex<TrackerSim>,

    pub history: HistoryClient,
    pub news: NewsClient,

    pub recent_errors: RwLock<Vec<ErrorRecord>>,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct the full engine state from config. `tracker_seed` pins the
    /// grid simulation for reproducible runs.
    pub fn new(config: RuntimeConfig, tracker_seed: u64) -> Self {
        let tracker = TrackerSim::new(config.tracker.clone(), tracker_seed);
        let news = NewsClient::new(
            std::env::var("TRAPGATE_NEWS_URL")
                .unwrap_or_else(|_| "http://localhost:9700".to_string()),
            config.news_limit,
        );

        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            store: Arc::new(SessionStore::new()),
            tracker: Mutex::new(tracker),
            history: HistoryClient::new(),
            news,
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    /// A signal engine configured from the current params. Cheap to build,
    /// so callers take a fresh one per evaluation batch and automatically
    /// pick up config changes.
    pub fn signal_engine(&self) -> SignalEngine {
        SignalEngine::new(self.runtime_config.read().signal.clone())
    }

    // ── Version management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error logging ───────────────────────────────────────────────────

    /// Record an error message for the dashboard; ring capped at
    /// [`MAX_RECENT_ERRORS`].
    pub fn push_error(&self, message: String) {
        let mut errors = self.recent_errors.write();
        errors.push(ErrorRecord {
            message,
            at: Utc::now().to_rfc3339(),
        });
        let overflow = errors.len().saturating_sub(MAX_RECENT_ERRORS);
        if overflow > 0 {
            errors.drain(..overflow);
        }
        drop(errors);
        self.increment_version();
    }

    // ── Snapshot builder ────────────────────────────────────────────────

    /// Complete serialisable snapshot for `GET /api/v1/state`.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let config = self.runtime_config.read();
        let tracker = self.tracker.lock();

        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: Utc::now().timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            trading_mode: config.trading_mode.to_string(),
            symbols: config.symbols.clone(),
            desk: DeskCounts {
                intake: self.store.intake_snapshot().len(),
                triage: self.store.triage_snapshot().len(),
                rooms: self.store.rooms_snapshot().len(),
                couplings: self.store.couplings_snapshot().len(),
                trades: self.store.trades_snapshot().len(),
                holdings: self.store.holdings_snapshot().len(),
            },
            last_scan: self.store.last_scan_snapshot(),
            tracker: TrackerStatus {
                frame: tracker.frame(),
                live_objects: tracker.objects().len(),
                objects: tracker.objects().to_vec(),
            },
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}

// =============================================================================
// Serialisable snapshot types
// =============================================================================

/// Row counts for every desk log.
#[derive(Debug, Clone, Serialize)]
pub struct DeskCounts {
    pub intake: usize,
    pub triage: usize,
    pub rooms: usize,
    pub couplings: usize,
    pub trades: usize,
    pub holdings: usize,
}

/// Tracker digest for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStatus {
    pub frame: u64,
    pub live_objects: usize,
    pub objects: Vec<ProtoObject>,
}

/// Full engine state snapshot sent to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    pub trading_mode: String,
    pub symbols: Vec<String>,
    pub desk: DeskCounts,
    pub last_scan: Vec<ScanRecord>,
    pub tracker: TrackerStatus,
    pub recent_errors: Vec<ErrorRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::new(RuntimeConfig::default(), 7)
    }

    #[test]
    fn version_counter_increments() {
        let s = state();
        let v0 = s.current_state_version();
        s.increment_version();
        assert_eq!(s.current_state_version(), v0 + 1);
    }

    #[test]
    fn error_ring_stays_bounded() {
        let s = state();
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            s.push_error(format!("e{i}"));
        }
        let errors = s.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "e5");
    }

    #[test]
    fn snapshot_reflects_store_counts() {
        let s = state();
        let snap = s.build_snapshot();
        assert_eq!(snap.desk.intake, 0);
        assert_eq!(snap.tracker.frame, 0);
        assert_eq!(snap.symbols.len(), 6);

        s.tracker.lock().step();
        let snap = s.build_snapshot();
        assert_eq!(snap.tracker.frame, 1);
    }
}
