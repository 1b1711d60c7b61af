// =============================================================================
// Room Allocation — In-House State and Keyword Fingerprints
// =============================================================================
//
// Houses each triaged entry in its allocated room and computes the keyword
// fingerprint the coupling detector works from. Presence in the rooms log is
// the in-house state; rooms are never vacated within a session.

use std::collections::BTreeSet;

use crate::session::{Category, IntakeEntry, RoomEntry, RoomSource, TriageEntry};
use crate::stages::intake::now_stamp;

/// Filler words excluded from keyword fingerprints.
const STOP_WORDS: &[&str] = &[
    "this", "that", "with", "from", "have", "will", "your", "into", "they", "them", "when",
    "what", "also", "just", "more",
];

/// Lowercased ASCII words of at least 4 letters, stop-words removed.
pub fn keywords(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut word = String::new();
    for c in text.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_alphabetic() {
            word.push(c.to_ascii_lowercase());
        } else {
            if word.len() >= 4 && !STOP_WORDS.contains(&word.as_str()) {
                out.insert(std::mem::take(&mut word));
            }
            word.clear();
        }
    }
    out
}

/// Allocate a room for every triaged entry not yet housed.
///
/// The room inherits ticker/signal from its originating intake entry, and its
/// keyword fingerprint comes from the preview text.
pub fn allocate(
    triage: &[TriageEntry],
    intake: &[IntakeEntry],
    existing: &[RoomEntry],
) -> Vec<RoomEntry> {
    let housed: std::collections::HashSet<&str> =
        existing.iter().map(|r| r.tx_code.as_str()).collect();

    triage
        .iter()
        .filter(|t| !housed.contains(t.tx_code.as_str()))
        .map(|t| {
            let origin = intake.iter().find(|e| e.tx_code == t.tx_code);
            let source = if t.category == Category::SalesMarketing {
                RoomSource::Sales
            } else {
                RoomSource::External
            };
            RoomEntry {
                room_id: t.room_id.clone(),
                tx_code: t.tx_code.clone(),
                category: t.category,
                source,
                ticker: origin.and_then(|e| e.ticker.clone()),
                signal: origin.and_then(|e| e.signal),
                preview: t.preview.clone(),
                keywords: keywords(&t.preview),
                at: now_stamp(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{InputKind, IntakeStatus, RoutingAction};
    use crate::types::Signal;

    fn intake_entry(tx: &str, raw: &str, ticker: Option<&str>) -> IntakeEntry {
        IntakeEntry {
            tx_code: tx.to_string(),
            at: now_stamp(),
            kind: InputKind::Text,
            status: IntakeStatus::Arrived,
            ticker: ticker.map(str::to_string),
            signal: ticker.map(|_| Signal::Buy),
            preview: raw.chars().take(120).collect(),
            raw: raw.to_string(),
        }
    }

    fn triage_entry(tx: &str, room: &str, category: Category, preview: &str) -> TriageEntry {
        TriageEntry {
            tx_code: tx.to_string(),
            category,
            action: RoutingAction::Review,
            room_id: room.to_string(),
            preview: preview.to_string(),
            at: now_stamp(),
        }
    }

    #[test]
    fn keywords_filter_short_and_stop_words() {
        let kw = keywords("This market price momentum will move with the breakout");
        assert!(kw.contains("market"));
        assert!(kw.contains("price"));
        assert!(kw.contains("momentum"));
        assert!(kw.contains("breakout"));
        // Stop words and short words excluded.
        assert!(!kw.contains("this"));
        assert!(!kw.contains("with"));
        assert!(!kw.contains("the"));
    }

    #[test]
    fn keywords_split_on_non_alpha() {
        let kw = keywords("gate=1.5;trap/strength signal-decay");
        assert!(kw.contains("gate"));
        assert!(kw.contains("trap"));
        assert!(kw.contains("strength"));
        assert!(kw.contains("signal"));
        assert!(kw.contains("decay"));
    }

    #[test]
    fn allocate_houses_new_entries_once() {
        let intake = vec![intake_entry("TX-1", "buy stock momentum", Some("AAPL"))];
        let triage = vec![triage_entry(
            "TX-1",
            "RM-AAAA1111",
            Category::SalesMarketing,
            "buy stock momentum",
        )];

        let rooms = allocate(&triage, &intake, &[]);
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_id, "RM-AAAA1111");
        assert_eq!(rooms[0].source, RoomSource::Sales);
        assert_eq!(rooms[0].ticker.as_deref(), Some("AAPL"));
        assert!(rooms[0].keywords.contains("momentum"));

        // Second pass: nothing new to house.
        assert!(allocate(&triage, &intake, &rooms).is_empty());
    }

    #[test]
    fn non_sales_rooms_are_external() {
        let intake = vec![intake_entry("TX-2", "please review the question", None)];
        let triage = vec![triage_entry(
            "TX-2",
            "RM-BBBB2222",
            Category::RequiresReply,
            "please review the question",
        )];
        let rooms = allocate(&triage, &intake, &[]);
        assert_eq!(rooms[0].source, RoomSource::External);
        assert!(rooms[0].ticker.is_none());
    }
}
