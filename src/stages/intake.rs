// =============================================================================
// Intake — Passive Arrival Tagging
// =============================================================================
//
// Wraps raw content into an `IntakeEntry` with a unique transaction code and
// a bounded preview. Intake never interprets content; that is triage's job.

use chrono::Utc;
use uuid::Uuid;

use crate::error::EngineError;
use crate::session::{InputKind, IntakeEntry, IntakeStatus};
use crate::types::Signal;

/// Characters of raw content kept in the preview field.
pub const PREVIEW_LEN: usize = 120;

/// "TX-" followed by 10 uppercase hex characters.
pub fn new_tx_code() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TX-{}", &hex[..10])
}

/// Current timestamp in the format every desk log uses.
pub fn now_stamp() -> String {
    Utc::now().to_rfc3339()
}

/// Char-boundary-safe preview truncation.
pub fn preview_of(raw: &str) -> String {
    raw.chars().take(PREVIEW_LEN).collect()
}

/// Build one intake entry from raw content.
///
/// Empty (all-whitespace) content is an `InvalidInput`, not a silent no-op:
/// the desk refuses arrivals with nothing in them.
pub fn build_entry(
    kind: InputKind,
    raw: impl Into<String>,
    ticker: Option<String>,
    signal: Option<Signal>,
) -> Result<IntakeEntry, EngineError> {
    let raw = raw.into();
    if raw.trim().is_empty() {
        return Err(EngineError::invalid("no input provided"));
    }

    Ok(IntakeEntry {
        tx_code: new_tx_code(),
        at: now_stamp(),
        kind,
        status: IntakeStatus::Arrived,
        ticker: ticker.map(|t| t.trim().to_uppercase()),
        signal,
        preview: preview_of(&raw),
        raw,
    })
}
