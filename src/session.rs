// =============================================================================
// Session Store — Explicit Shared State for the Desk Pipeline
// =============================================================================
//
// The single owner of every desk log: intake, triage, rooms, couplings, the
// latest market scan, trades, and holdings. Pipeline stages are pure
// functions over snapshots of these logs; they return deltas and the store
// applies them. Nothing reaches this state except through the read/append
// operations below.
//
// State is session-scoped and deliberately not durable: it exists for the
// lifetime of the process only.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::signal::MetricSnapshot;
use crate::types::Signal;

/// Ring caps: the intake and trade logs grow on every scan, so they are
/// trimmed oldest-first.
const MAX_INTAKE_ENTRIES: usize = 1_000;
const MAX_TRADE_RECORDS: usize = 500;

// =============================================================================
// Record types
// =============================================================================

/// How an intake entry arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    Text,
    File,
    Scan,
    News,
}

/// Where an intake entry sits in the desk pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeStatus {
    Arrived,
    Triaged,
}

/// One raw arrival, tagged with a transaction code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeEntry {
    /// "TX-" + 10 uppercase hex characters; unique per arrival.
    pub tx_code: String,
    /// RFC 3339 arrival timestamp.
    pub at: String,
    pub kind: InputKind,
    pub status: IntakeStatus,
    /// Present for scan/news entries that resolve to an instrument.
    pub ticker: Option<String>,
    pub signal: Option<Signal>,
    /// First 120 characters of the raw content.
    pub preview: String,
    pub raw: String,
}

/// Routing category assigned by triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    SalesMarketing,
    RequiresReply,
    SystemSignal,
    InformationOnly,
    Unknown,
}

/// Follow-up required for a triaged entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingAction {
    RouteToSales,
    Review,
    EscalateManager,
    NoAction,
}

/// Triage verdict for one intake entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageEntry {
    pub tx_code: String,
    pub category: Category,
    pub action: RoutingAction,
    /// "RM-" + 8 uppercase hex characters, allocated at triage time.
    pub room_id: String,
    pub preview: String,
    pub at: String,
}

/// Origin of a housed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomSource {
    Sales,
    External,
}

/// An allocated room. Presence in the rooms log means "in house".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEntry {
    pub room_id: String,
    pub tx_code: String,
    pub category: Category,
    pub source: RoomSource,
    pub ticker: Option<String>,
    pub signal: Option<Signal>,
    pub preview: String,
    /// Vocabulary fingerprint used by the coupling detector.
    pub keywords: BTreeSet<String>,
    pub at: String,
}

/// Strength tier of a detected coupling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouplingStrength {
    Full,
    Strong,
    Potential,
}

impl CouplingStrength {
    /// Contribution of one edge to a ticker's coupling score.
    pub fn score(self) -> f64 {
        match self {
            Self::Full => 2.0,
            Self::Strong => 1.5,
            Self::Potential => 0.5,
        }
    }
}

impl std::fmt::Display for CouplingStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "FULLY_COUPLED"),
            Self::Strong => write!(f, "STRONGLY_COUPLED"),
            Self::Potential => write!(f, "POTENTIAL"),
        }
    }
}

/// A keyword-overlap link between two rooms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingEdge {
    pub room_a: String,
    pub room_b: String,
    pub ticker_a: Option<String>,
    pub ticker_b: Option<String>,
    pub strength: CouplingStrength,
    /// Up to 10 shared keywords, sorted.
    pub shared: Vec<String>,
}

/// One instrument's result from the latest market scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub ticker: String,
    pub at: String,
    pub snapshot: MetricSnapshot,
}

/// A paper-portfolio position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub qty: f64,
    pub avg_price: f64,
    pub date_added: String,
}

/// Executed trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// One line of the paper trade log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub at: String,
    pub action: TradeAction,
    pub ticker: String,
    pub qty: f64,
    pub price: f64,
    /// Capped at 160 characters at construction.
    pub reason: String,
}

// =============================================================================
// SessionStore
// =============================================================================

/// Owns every desk log behind its own lock. Readers take cloned snapshots so
/// the pure stage functions never hold a lock while computing.
#[derive(Default)]
pub struct SessionStore {
    intake: RwLock<Vec<IntakeEntry>>,
    triage: RwLock<Vec<TriageEntry>>,
    rooms: RwLock<Vec<RoomEntry>>,
    couplings: RwLock<Vec<CouplingEdge>>,
    last_scan: RwLock<Vec<ScanRecord>>,
    trades: RwLock<Vec<TradeRecord>>,
    holdings: RwLock<Vec<Holding>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Intake ──────────────────────────────────────────────────────────

    pub fn append_intake(&self, entry: IntakeEntry) {
        let mut log = self.intake.write();
        log.push(entry);
        let overflow = log.len().saturating_sub(MAX_INTAKE_ENTRIES);
        if overflow > 0 {
            log.drain(..overflow);
        }
    }

    pub fn intake_snapshot(&self) -> Vec<IntakeEntry> {
        self.intake.read().clone()
    }

    /// Flip the named entries from Arrived to Triaged.
    pub fn mark_triaged(&self, tx_codes: &[String]) {
        let mut log = self.intake.write();
        for entry in log.iter_mut() {
            if tx_codes.iter().any(|t| t == &entry.tx_code) {
                entry.status = IntakeStatus::Triaged;
            }
        }
    }

    // ── Triage ──────────────────────────────────────────────────────────

    pub fn append_triage(&self, entries: Vec<TriageEntry>) {
        self.triage.write().extend(entries);
    }

    pub fn triage_snapshot(&self) -> Vec<TriageEntry> {
        self.triage.read().clone()
    }

    // ── Rooms ───────────────────────────────────────────────────────────

    pub fn append_rooms(&self, entries: Vec<RoomEntry>) {
        self.rooms.write().extend(entries);
    }

    pub fn rooms_snapshot(&self) -> Vec<RoomEntry> {
        self.rooms.read().clone()
    }

    // ── Couplings ───────────────────────────────────────────────────────

    /// Couplings are recomputed wholesale, never appended.
    pub fn replace_couplings(&self, edges: Vec<CouplingEdge>) {
        *self.couplings.write() = edges;
    }

    pub fn couplings_snapshot(&self) -> Vec<CouplingEdge> {
        self.couplings.read().clone()
    }

    // ── Scan ────────────────────────────────────────────────────────────

    /// The latest scan replaces the previous one.
    pub fn set_last_scan(&self, records: Vec<ScanRecord>) {
        *self.last_scan.write() = records;
    }

    pub fn last_scan_snapshot(&self) -> Vec<ScanRecord> {
        self.last_scan.read().clone()
    }

    // ── Trades & holdings ───────────────────────────────────────────────

    pub fn append_trades(&self, records: Vec<TradeRecord>) {
        let mut log = self.trades.write();
        log.extend(records);
        let overflow = log.len().saturating_sub(MAX_TRADE_RECORDS);
        if overflow > 0 {
            log.drain(..overflow);
        }
    }

    pub fn trades_snapshot(&self) -> Vec<TradeRecord> {
        self.trades.read().clone()
    }

    pub fn holdings_snapshot(&self) -> Vec<Holding> {
        self.holdings.read().clone()
    }

    /// Holdings are replaced with the executor's output delta.
    pub fn replace_holdings(&self, holdings: Vec<Holding>) {
        *self.holdings.write() = holdings;
    }
}
