// =============================================================================
// Decision Engine — Mode-B Action Plan and Executor
// =============================================================================
//
// Builds the paper-trading action plan from the latest scan, the coupling
// graph, and the intake log:
//
//   Trigger:   bullseye (either side) OR per-ticker coupling score >= 2.0.
//   Direction: BUY when the signal says BUY or a strong coupling rides a
//              positive rise score; SELL mirrored; otherwise WAIT (the row
//              stays in the plan for the operator to see).
//   Size:      base qty scaled by coupling (up to +60%), news flow (up to
//              +30%), and a gate bonus for well-conditioned BUYs.
//
// Execution applies the plan against the holdings under the configured risk
// limits. Both halves are pure functions over their snapshots.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::portfolio::{make_trade, upsert};
use crate::runtime_config::RiskLimits;
use crate::session::{
    CouplingEdge, Holding, InputKind, IntakeEntry, RoomEntry, ScanRecord, TradeAction,
    TradeRecord,
};
use crate::stages::coupling::{ticker_score, CouplingLabel};
use crate::types::Signal;

/// Intake rows considered when counting recent news per ticker.
const NEWS_WINDOW: usize = 200;

/// Coupling score at which coupling alone can trigger an action.
const STRONG_COUPLING_SCORE: f64 = 2.0;

/// Rise-score magnitude a coupling-only trigger needs for a direction.
const COUPLED_RISE_FLOOR: f64 = 0.5;

/// One row of the action plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    pub ticker: String,
    pub action: Signal,
    pub qty: f64,
    pub price: Option<f64>,
    pub signal: Signal,
    pub rise_score: f64,
    pub gate: f64,
    pub z_trap: f64,
    pub coupling_score: f64,
    pub coupling_label: CouplingLabel,
    pub news_count: usize,
    pub in_house: bool,
    pub reason: String,
    pub priority: f64,
}

/// Count recent news intake rows for `ticker` within the news window.
pub fn news_count(ticker: &str, intake: &[IntakeEntry]) -> usize {
    let t = ticker.trim().to_uppercase();
    let start = intake.len().saturating_sub(NEWS_WINDOW);
    intake[start..]
        .iter()
        .filter(|e| e.kind == InputKind::News && e.ticker.as_deref() == Some(t.as_str()))
        .count()
}

fn in_house(ticker: &str, rooms: &[RoomEntry]) -> bool {
    let t = ticker.trim().to_uppercase();
    rooms.iter().any(|r| r.ticker.as_deref() == Some(t.as_str()))
}

/// Build the plan from the latest scan. Untriggered instruments are omitted;
/// triggered-but-directionless rows stay as WAIT.
pub fn build_plan(
    scan: &[ScanRecord],
    edges: &[CouplingEdge],
    intake: &[IntakeEntry],
    rooms: &[RoomEntry],
    risk: &RiskLimits,
) -> Vec<PlannedAction> {
    let mut plan = Vec::new();

    for record in scan {
        let ticker = record.ticker.trim().to_uppercase();
        if ticker.is_empty() {
            continue;
        }

        let snap = &record.snapshot;
        let (cscore, clabel) = ticker_score(&ticker, edges);
        let ncount = news_count(&ticker, intake);
        let housed = in_house(&ticker, rooms);

        let coupled_strong = cscore >= STRONG_COUPLING_SCORE;
        let triggered = snap.bullseye_buy || snap.bullseye_sell || coupled_strong;
        if !triggered {
            continue;
        }

        let mut reason_bits = Vec::new();
        if snap.bullseye_buy {
            reason_bits.push("BULLSEYE_BUY".to_string());
        }
        if snap.bullseye_sell {
            reason_bits.push("BULLSEYE_SELL".to_string());
        }
        if coupled_strong {
            reason_bits.push(format!("COUPLED_{clabel}"));
        }
        if housed {
            reason_bits.push("IN_HOUSE".to_string());
        }

        let action = if snap.signal == Signal::Buy
            || (coupled_strong && snap.rise_score > COUPLED_RISE_FLOOR)
        {
            Signal::Buy
        } else if snap.signal == Signal::Sell
            || (coupled_strong && snap.rise_score < -COUPLED_RISE_FLOOR)
        {
            Signal::Sell
        } else {
            Signal::Wait
        };
        reason_bits.push(format!("SIGNAL:{}", snap.signal));
        reason_bits.push(format!("RISE:{:.2}", snap.rise_score));

        // Size: coupling up to +60%, news up to +30%, gate bonus for
        // well-conditioned buys.
        let mut mult = 1.0 + cscore.min(6.0) * 0.10;
        mult *= 1.0 + (ncount.min(10) as f64) * 0.03;
        if action == Signal::Buy && snap.gate > 1.5 && snap.z_trap < 0.85 {
            mult *= 1.15;
        }
        let qty = (risk.base_qty * mult).round().max(1.0);

        let priority = match action {
            Signal::Buy => snap.rise_score + cscore,
            _ => -snap.rise_score + cscore,
        };

        plan.push(PlannedAction {
            ticker,
            action,
            qty,
            price: Some(snap.price).filter(|p| p.is_finite() && *p > 0.0),
            signal: snap.signal,
            rise_score: snap.rise_score,
            gate: snap.gate,
            z_trap: snap.z_trap,
            coupling_score: cscore,
            coupling_label: clabel,
            news_count: ncount,
            in_house: housed,
            reason: reason_bits.join(" | "),
            priority,
        });
    }

    // BUYs first, then SELLs, then WAITs; highest priority first inside each.
    plan.sort_by(|a, b| {
        action_rank(a.action)
            .cmp(&action_rank(b.action))
            .then(b.priority.total_cmp(&a.priority))
    });

    debug!(rows = plan.len(), "action plan built");
    plan
}

fn action_rank(action: Signal) -> u8 {
    match action {
        Signal::Buy => 0,
        Signal::Sell => 1,
        Signal::Wait => 2,
    }
}

/// Result of applying a plan to the holdings.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    pub holdings: Vec<Holding>,
    pub trades: Vec<TradeRecord>,
    pub actions_applied: usize,
    pub rows_skipped: usize,
}

/// Apply `plan` to `holdings` under the risk limits.
///
/// Rows without a usable price fall back to the prefetched `prices` map and
/// are skipped when still unresolved. WAIT rows never execute.
pub fn execute_plan(
    plan: &[PlannedAction],
    holdings: Vec<Holding>,
    limits: &RiskLimits,
    prices: &HashMap<String, f64>,
    now: &str,
) -> ExecutionOutcome {
    let mut holdings = holdings;
    let mut trades = Vec::new();
    let mut actions_applied = 0usize;
    let mut rows_skipped = 0usize;

    let mut open_positions: HashSet<String> =
        holdings.iter().map(|h| h.ticker.clone()).collect();

    for row in plan {
        if actions_applied >= limits.max_actions_per_run {
            rows_skipped += plan.len() - (actions_applied + rows_skipped);
            break;
        }

        let px = match row.price.or_else(|| prices.get(&row.ticker).copied()) {
            Some(px) if px.is_finite() && px > 0.0 => px,
            _ => {
                rows_skipped += 1;
                continue;
            }
        };

        let current_qty = holdings
            .iter()
            .find(|h| h.ticker == row.ticker)
            .map_or(0.0, |h| h.qty);

        match row.action {
            Signal::Buy => {
                if !open_positions.contains(&row.ticker)
                    && open_positions.len() >= limits.max_positions
                {
                    rows_skipped += 1;
                    continue;
                }
                let allowed = limits.max_qty_per_ticker - current_qty;
                let qty = row.qty.min(allowed);
                if qty <= 0.0 {
                    rows_skipped += 1;
                    continue;
                }

                holdings = upsert(holdings, &row.ticker, qty, px, now);
                trades.push(make_trade(TradeAction::Buy, &row.ticker, qty, px, &row.reason, now));
                open_positions.insert(row.ticker.clone());
                actions_applied += 1;
            }
            Signal::Sell => {
                if current_qty <= 0.0 {
                    rows_skipped += 1;
                    continue;
                }
                let qty = row.qty.min(current_qty);

                holdings = upsert(holdings, &row.ticker, -qty, px, now);
                trades.push(make_trade(
                    TradeAction::Sell,
                    &row.ticker,
                    -qty,
                    px,
                    &row.reason,
                    now,
                ));
                if !holdings.iter().any(|h| h.ticker == row.ticker) {
                    open_positions.remove(&row.ticker);
                }
                actions_applied += 1;
            }
            Signal::Wait => {
                rows_skipped += 1;
            }
        }
    }

    info!(
        applied = actions_applied,
        skipped = rows_skipped,
        "plan execution finished"
    );

    ExecutionOutcome {
        holdings,
        trades,
        actions_applied,
        rows_skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CouplingStrength, IntakeStatus};
    use crate::signal::MetricSnapshot;

    const NOW: &str = "2026-01-01T00:00:00Z";

    fn snapshot(signal: Signal, bullseye: bool, rise: f64, gate: f64, z: f64) -> MetricSnapshot {
        MetricSnapshot {
            price: 100.0,
            z_trap: z,
            sigma: 1.0,
            gate,
            price_location: 0.3,
            rise_score: rise,
            signal,
            phase_zero: signal != Signal::Wait,
            bullseye_buy: bullseye && signal == Signal::Buy,
            bullseye_sell: bullseye && signal == Signal::Sell,
            insufficient_history: false,
        }
    }

    fn scan(ticker: &str, snap: MetricSnapshot) -> ScanRecord {
        ScanRecord {
            ticker: ticker.to_string(),
            at: NOW.to_string(),
            snapshot: snap,
        }
    }

    fn coupled_edge(ticker: &str, strength: CouplingStrength) -> CouplingEdge {
        CouplingEdge {
            room_a: "RM-A".into(),
            room_b: "RM-B".into(),
            ticker_a: Some(ticker.to_string()),
            ticker_b: None,
            strength,
            shared: vec![],
        }
    }

    fn news(ticker: &str) -> IntakeEntry {
        IntakeEntry {
            tx_code: "TX-N".into(),
            at: NOW.into(),
            kind: InputKind::News,
            status: IntakeStatus::Arrived,
            ticker: Some(ticker.to_string()),
            signal: None,
            preview: String::new(),
            raw: String::new(),
        }
    }

    #[test]
    fn untriggered_rows_are_omitted() {
        let scan = vec![scan("AAPL", snapshot(Signal::Wait, false, 0.0, 0.0, 0.9))];
        let plan = build_plan(&scan, &[], &[], &[], &RiskLimits::default());
        assert!(plan.is_empty());
    }

    #[test]
    fn bullseye_triggers_buy() {
        let scan = vec![scan("AAPL", snapshot(Signal::Buy, true, 1.2, 2.0, 0.5))];
        let plan = build_plan(&scan, &[], &[], &[], &RiskLimits::default());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].action, Signal::Buy);
        assert!(plan[0].reason.contains("BULLSEYE_BUY"));
    }

    #[test]
    fn strong_coupling_with_rise_triggers_direction() {
        let edges = vec![
            coupled_edge("AAPL", CouplingStrength::Full), // 2.0 alone
        ];
        let up = vec![scan("AAPL", snapshot(Signal::Wait, false, 0.8, 0.5, 0.9))];
        let plan = build_plan(&up, &edges, &[], &[], &RiskLimits::default());
        assert_eq!(plan[0].action, Signal::Buy);

        let down = vec![scan("AAPL", snapshot(Signal::Wait, false, -0.8, 0.5, 0.9))];
        let plan = build_plan(&down, &edges, &[], &[], &RiskLimits::default());
        assert_eq!(plan[0].action, Signal::Sell);

        // Flat rise: triggered but directionless.
        let flat = vec![scan("AAPL", snapshot(Signal::Wait, false, 0.1, 0.5, 0.9))];
        let plan = build_plan(&flat, &edges, &[], &[], &RiskLimits::default());
        assert_eq!(plan[0].action, Signal::Wait);
    }

    #[test]
    fn sizing_applies_all_multipliers() {
        let edges = vec![
            coupled_edge("AAPL", CouplingStrength::Full),
            coupled_edge("AAPL", CouplingStrength::Full),
        ]; // coupling score 4.0
        let intake: Vec<IntakeEntry> = (0..5).map(|_| news("AAPL")).collect();
        let scan = vec![scan("AAPL", snapshot(Signal::Buy, true, 1.5, 2.0, 0.5))];
        let plan = build_plan(&scan, &edges, &intake, &[], &RiskLimits::default());

        // base 10 * (1 + 0.4) * (1 + 0.15) * 1.15 = 18.515 -> 19
        assert!((plan[0].qty - 19.0).abs() < 1e-12);
        assert_eq!(plan[0].news_count, 5);
        assert_eq!(plan[0].coupling_label, CouplingLabel::Heavy);
    }

    #[test]
    fn buys_sort_before_sells_by_priority() {
        let rows = vec![
            scan("AAA", snapshot(Signal::Sell, true, -0.5, 2.0, 0.5)),
            scan("BBB", snapshot(Signal::Buy, true, 0.5, 2.0, 0.5)),
            scan("CCC", snapshot(Signal::Buy, true, 2.5, 2.0, 0.5)),
        ];
        let plan = build_plan(&rows, &[], &[], &[], &RiskLimits::default());
        assert_eq!(plan[0].ticker, "CCC");
        assert_eq!(plan[1].ticker, "BBB");
        assert_eq!(plan[2].ticker, "AAA");
    }

    #[test]
    fn executor_respects_max_positions() {
        let limits = RiskLimits {
            max_positions: 1,
            ..RiskLimits::default()
        };
        let rows = vec![
            scan("AAA", snapshot(Signal::Buy, true, 2.0, 2.0, 0.5)),
            scan("BBB", snapshot(Signal::Buy, true, 1.0, 2.0, 0.5)),
        ];
        let plan = build_plan(&rows, &[], &[], &[], &limits);
        let out = execute_plan(&plan, vec![], &limits, &HashMap::new(), NOW);
        assert_eq!(out.actions_applied, 1);
        assert_eq!(out.holdings.len(), 1);
        assert_eq!(out.holdings[0].ticker, "AAA");
    }

    #[test]
    fn executor_caps_qty_per_ticker() {
        let limits = RiskLimits {
            max_qty_per_ticker: 15.0,
            ..RiskLimits::default()
        };
        let rows = vec![scan("AAA", snapshot(Signal::Buy, true, 2.0, 2.0, 0.5))];
        let plan = build_plan(&rows, &[], &[], &[], &limits);

        let holdings = vec![Holding {
            ticker: "AAA".into(),
            qty: 10.0,
            avg_price: 90.0,
            date_added: NOW.into(),
        }];
        let out = execute_plan(&plan, holdings, &limits, &HashMap::new(), NOW);
        // Only 5 more allowed on top of the existing 10.
        assert!((out.holdings[0].qty - 15.0).abs() < 1e-12);
    }

    #[test]
    fn executor_skips_sell_without_position() {
        let rows = vec![scan("AAA", snapshot(Signal::Sell, true, -2.0, 2.0, 0.5))];
        let limits = RiskLimits::default();
        let plan = build_plan(&rows, &[], &[], &[], &limits);
        let out = execute_plan(&plan, vec![], &limits, &HashMap::new(), NOW);
        assert_eq!(out.actions_applied, 0);
        assert!(out.trades.is_empty());
    }

    #[test]
    fn executor_sell_closes_and_logs_negative_qty() {
        let rows = vec![scan("AAA", snapshot(Signal::Sell, true, -2.0, 2.0, 0.5))];
        let limits = RiskLimits::default();
        let plan = build_plan(&rows, &[], &[], &[], &limits);

        let holdings = vec![Holding {
            ticker: "AAA".into(),
            qty: 5.0,
            avg_price: 90.0,
            date_added: NOW.into(),
        }];
        let out = execute_plan(&plan, holdings, &limits, &HashMap::new(), NOW);
        assert_eq!(out.actions_applied, 1);
        assert!(out.holdings.is_empty());
        assert_eq!(out.trades.len(), 1);
        assert!(out.trades[0].qty < 0.0);
    }

    #[test]
    fn executor_resolves_price_from_map() {
        let mut snap = snapshot(Signal::Buy, true, 2.0, 2.0, 0.5);
        snap.price = 0.0; // unusable price on the scan record
        let rows = vec![scan("AAA", snap)];
        let limits = RiskLimits::default();
        let plan = build_plan(&rows, &[], &[], &[], &limits);
        assert!(plan[0].price.is_none());

        // Without a prefetched price the row is skipped.
        let out = execute_plan(&plan, vec![], &limits, &HashMap::new(), NOW);
        assert_eq!(out.actions_applied, 0);

        let mut prices = HashMap::new();
        prices.insert("AAA".to_string(), 42.0);
        let out = execute_plan(&plan, vec![], &limits, &prices, NOW);
        assert_eq!(out.actions_applied, 1);
        assert!((out.holdings[0].avg_price - 42.0).abs() < 1e-12);
    }

    #[test]
    fn executor_stops_at_action_budget() {
        let limits = RiskLimits {
            max_actions_per_run: 2,
            ..RiskLimits::default()
        };
        let rows: Vec<ScanRecord> = ["AAA", "BBB", "CCC", "DDD"]
            .iter()
            .map(|t| scan(t, snapshot(Signal::Buy, true, 1.0, 2.0, 0.5)))
            .collect();
        let plan = build_plan(&rows, &[], &[], &[], &limits);
        let out = execute_plan(&plan, vec![], &limits, &HashMap::new(), NOW);
        assert_eq!(out.actions_applied, 2);
    }
}
