// =============================================================================
// Coupling Detection — Keyword Overlap Between Rooms
// =============================================================================
//
// Links rooms whose keyword fingerprints overlap. Tiers by intersection size:
//
//   |A ∩ B| >= 10  =>  Full      (score 2.0)
//   |A ∩ B| >=  7  =>  Strong    (score 1.5)
//   |A ∩ B| >=  4  =>  Potential (score 0.5)
//
// Per-ticker coupling scores sum the incident edge scores and label the
// total: HEAVY >= 4.0, STRONG >= 2.0, LIGHT >= 0.5, else NONE. Edges are
// recomputed wholesale from the current rooms log on demand.

use serde::Serialize;

use crate::session::{CouplingEdge, CouplingStrength, RoomEntry};

/// Overlap floors for each strength tier.
const FULL_OVERLAP: usize = 10;
const STRONG_OVERLAP: usize = 7;
const POTENTIAL_OVERLAP: usize = 4;

/// Shared keywords retained on an edge.
const MAX_SHARED_KEYWORDS: usize = 10;

/// Aggregate label for a ticker's total coupling score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CouplingLabel {
    Heavy,
    Strong,
    Light,
    None,
}

impl std::fmt::Display for CouplingLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Heavy => write!(f, "HEAVY"),
            Self::Strong => write!(f, "STRONG"),
            Self::Light => write!(f, "LIGHT"),
            Self::None => write!(f, "NONE"),
        }
    }
}

fn strength_for(overlap: usize) -> Option<CouplingStrength> {
    if overlap >= FULL_OVERLAP {
        Some(CouplingStrength::Full)
    } else if overlap >= STRONG_OVERLAP {
        Some(CouplingStrength::Strong)
    } else if overlap >= POTENTIAL_OVERLAP {
        Some(CouplingStrength::Potential)
    } else {
        None
    }
}

/// Recompute every coupling edge over the current rooms.
pub fn detect(rooms: &[RoomEntry]) -> Vec<CouplingEdge> {
    let mut edges = Vec::new();
    for i in 0..rooms.len() {
        for j in (i + 1)..rooms.len() {
            let a = &rooms[i];
            let b = &rooms[j];
            let shared: Vec<String> = a.keywords.intersection(&b.keywords).cloned().collect();

            let Some(strength) = strength_for(shared.len()) else {
                continue;
            };

            // BTreeSet intersection is already sorted.
            let mut shared = shared;
            shared.truncate(MAX_SHARED_KEYWORDS);

            edges.push(CouplingEdge {
                room_a: a.room_id.clone(),
                room_b: b.room_id.clone(),
                ticker_a: a.ticker.clone(),
                ticker_b: b.ticker.clone(),
                strength,
                shared,
            });
        }
    }
    edges
}

/// Sum of incident edge scores for `ticker`, with its aggregate label.
pub fn ticker_score(ticker: &str, edges: &[CouplingEdge]) -> (f64, CouplingLabel) {
    let t = ticker.trim().to_uppercase();
    let score: f64 = edges
        .iter()
        .filter(|e| {
            e.ticker_a.as_deref().map(str::to_uppercase) == Some(t.clone())
                || e.ticker_b.as_deref().map(str::to_uppercase) == Some(t.clone())
        })
        .map(|e| e.strength.score())
        .sum();

    let label = if score >= 4.0 {
        CouplingLabel::Heavy
    } else if score >= 2.0 {
        CouplingLabel::Strong
    } else if score >= 0.5 {
        CouplingLabel::Light
    } else {
        CouplingLabel::None
    };
    (score, label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Category, RoomSource};
    use std::collections::BTreeSet;

    fn room(id: &str, ticker: Option<&str>, words: &[&str]) -> RoomEntry {
        RoomEntry {
            room_id: id.to_string(),
            tx_code: format!("TX-{id}"),
            category: Category::SalesMarketing,
            source: RoomSource::Sales,
            ticker: ticker.map(str::to_string),
            signal: None,
            preview: String::new(),
            keywords: words.iter().map(|w| w.to_string()).collect::<BTreeSet<_>>(),
            at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    const WORDS: &[&str] = &[
        "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india",
        "juliet", "kilo", "lima",
    ];

    #[test]
    fn overlap_tiers() {
        let base = room("A", None, &WORDS[..12]);
        assert_eq!(
            detect(&[base.clone(), room("B", None, &WORDS[..10])])[0].strength,
            CouplingStrength::Full
        );
        assert_eq!(
            detect(&[base.clone(), room("C", None, &WORDS[..7])])[0].strength,
            CouplingStrength::Strong
        );
        assert_eq!(
            detect(&[base.clone(), room("D", None, &WORDS[..4])])[0].strength,
            CouplingStrength::Potential
        );
        assert!(detect(&[base, room("E", None, &WORDS[..3])]).is_empty());
    }

    #[test]
    fn shared_keywords_sorted_and_capped() {
        let a = room("A", None, &WORDS[..12]);
        let b = room("B", None, &WORDS[..12]);
        let edges = detect(&[a, b]);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].shared.len(), MAX_SHARED_KEYWORDS);
        let mut sorted = edges[0].shared.clone();
        sorted.sort();
        assert_eq!(edges[0].shared, sorted);
    }

    #[test]
    fn detect_is_pairwise_exhaustive() {
        let rooms = vec![
            room("A", None, &WORDS[..8]),
            room("B", None, &WORDS[..8]),
            room("C", None, &WORDS[..8]),
        ];
        // Three rooms, all pairs over the Strong floor.
        assert_eq!(detect(&rooms).len(), 3);
    }

    #[test]
    fn ticker_score_sums_incident_edges() {
        let rooms = vec![
            room("A", Some("AAPL"), &WORDS[..12]),
            room("B", Some("MSFT"), &WORDS[..10]), // Full with A (2.0)
            room("C", None, &WORDS[..7]),          // Strong with A and B
        ];
        let edges = detect(&rooms);
        let (score, label) = ticker_score("AAPL", &edges);
        // Full (2.0) + Strong (1.5) = 3.5 => STRONG tier.
        assert!((score - 3.5).abs() < 1e-12);
        assert_eq!(label, CouplingLabel::Strong);

        let (score_none, label_none) = ticker_score("NVDA", &edges);
        assert_eq!(score_none, 0.0);
        assert_eq!(label_none, CouplingLabel::None);
    }

    #[test]
    fn ticker_score_is_case_insensitive() {
        let rooms = vec![
            room("A", Some("AAPL"), &WORDS[..10]),
            room("B", Some("AAPL"), &WORDS[..10]),
        ];
        let edges = detect(&rooms);
        let (score, _) = ticker_score(" aapl ", &edges);
        // One Full edge counted once per incident side of the same ticker.
        assert!(score > 0.0);
    }
}
