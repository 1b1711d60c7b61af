// =============================================================================
// Triage — Keyword Classification and Routing
// =============================================================================
//
// Routes each new intake entry into a category with a follow-up action and
// allocates its room id. Rules fire top-to-bottom; first match wins.

use uuid::Uuid;

use crate::session::{Category, IntakeEntry, RoutingAction, TriageEntry};
use crate::stages::intake::now_stamp;

/// "RM-" followed by 8 uppercase hex characters.
pub fn new_room_id() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("RM-{}", &hex[..8])
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// Classify raw content into a routing category and required action.
pub fn classify_text(text: &str) -> (Category, RoutingAction) {
    let t = text.to_lowercase();

    if contains_any(&t, &["buy", "sell", "stock", "share", "price"]) {
        return (Category::SalesMarketing, RoutingAction::RouteToSales);
    }
    if contains_any(&t, &["help", "reply", "question", "?"]) {
        return (Category::RequiresReply, RoutingAction::Review);
    }
    if contains_any(&t, &["system", "error", "alert"]) {
        return (Category::SystemSignal, RoutingAction::EscalateManager);
    }
    if t.trim().len() < 20 {
        return (Category::InformationOnly, RoutingAction::NoAction);
    }
    (Category::Unknown, RoutingAction::Review)
}

/// Triage every intake entry not yet present in the triage log.
///
/// Pure over its inputs; the caller appends the returned entries and marks
/// the corresponding intake rows triaged.
pub fn triage_new(intake: &[IntakeEntry], already: &[TriageEntry]) -> Vec<TriageEntry> {
    let processed: std::collections::HashSet<&str> =
        already.iter().map(|t| t.tx_code.as_str()).collect();

    intake
        .iter()
        .filter(|e| !processed.contains(e.tx_code.as_str()))
        .map(|e| {
            let (category, action) = classify_text(&e.raw);
            TriageEntry {
                tx_code: e.tx_code.clone(),
                category,
                action,
                room_id: new_room_id(),
                preview: e.preview.clone(),
                at: now_stamp(),
            }
        })
        .collect()
}
