// =============================================================================
// Paper Portfolio — Holdings, Trade Log, Valuation
// =============================================================================
//
// Position bookkeeping as pure functions: `upsert` takes the current holdings
// and returns the next holdings, the caller applies them through the session
// store. Buys blend into a weighted average price; sells keep the average and
// remove the position when quantity reaches zero.

use std::collections::HashMap;

use serde::Serialize;

use crate::session::{Holding, TradeAction, TradeRecord};

/// Characters of reason text kept on a trade record.
const MAX_REASON_LEN: usize = 160;

/// Apply one quantity delta at price `px` and return the next holdings.
///
/// * Positive delta on an existing position: weighted-average the entry price.
/// * Negative delta: quantity shrinks, the average price is untouched.
/// * Quantity at or below zero removes the position.
/// * Negative delta on a missing position is a no-op.
pub fn upsert(
    holdings: Vec<Holding>,
    ticker: &str,
    qty_delta: f64,
    px: f64,
    now: &str,
) -> Vec<Holding> {
    let ticker = ticker.trim().to_uppercase();
    let mut out = Vec::with_capacity(holdings.len() + 1);
    let mut found = false;

    for mut h in holdings {
        if h.ticker != ticker {
            out.push(h);
            continue;
        }
        found = true;

        let new_qty = h.qty + qty_delta;
        if new_qty <= 0.0 {
            continue; // position closed, dropped entirely
        }
        if qty_delta > 0.0 {
            h.avg_price = (h.qty * h.avg_price + qty_delta * px) / new_qty;
        }
        h.qty = new_qty;
        out.push(h);
    }

    if !found && qty_delta > 0.0 {
        out.push(Holding {
            ticker,
            qty: qty_delta,
            avg_price: px,
            date_added: now.to_string(),
        });
    }

    out
}

/// Build one trade-log line with a capped reason.
pub fn make_trade(
    action: TradeAction,
    ticker: &str,
    qty: f64,
    price: f64,
    reason: &str,
    now: &str,
) -> TradeRecord {
    TradeRecord {
        at: now.to_string(),
        action,
        ticker: ticker.trim().to_uppercase(),
        qty,
        price,
        reason: reason.chars().take(MAX_REASON_LEN).collect(),
    }
}

/// One holding marked to market.
#[derive(Debug, Clone, Serialize)]
pub struct HoldingValue {
    pub ticker: String,
    pub qty: f64,
    pub avg_price: f64,
    pub live_price: Option<f64>,
    pub market_value: Option<f64>,
    pub cost_basis: f64,
    pub unrealized_pnl: Option<f64>,
}

/// Whole-portfolio mark-to-market against a caller-supplied price map.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioValuation {
    pub rows: Vec<HoldingValue>,
    pub market_value: f64,
    pub cost_basis: f64,
    pub unrealized_pnl: f64,
}

/// Value every holding against `prices`. Tickers without a live price keep
/// their cost basis but contribute no market value or PnL.
pub fn valuation(holdings: &[Holding], prices: &HashMap<String, f64>) -> PortfolioValuation {
    let mut rows = Vec::with_capacity(holdings.len());
    let mut market_value = 0.0;
    let mut cost_basis = 0.0;
    let mut unrealized_pnl = 0.0;

    for h in holdings {
        let live = prices.get(&h.ticker).copied();
        let cost = h.qty * h.avg_price;
        cost_basis += cost;

        let (mv, pnl) = match live {
            Some(px) => {
                let mv = h.qty * px;
                market_value += mv;
                unrealized_pnl += mv - cost;
                (Some(mv), Some(mv - cost))
            }
            None => (None, None),
        };

        rows.push(HoldingValue {
            ticker: h.ticker.clone(),
            qty: h.qty,
            avg_price: h.avg_price,
            live_price: live,
            market_value: mv,
            cost_basis: cost,
            unrealized_pnl: pnl,
        });
    }

    PortfolioValuation {
        rows,
        market_value,
        cost_basis,
        unrealized_pnl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2026-01-01T00:00:00Z";

    #[test]
    fn buy_opens_position() {
        let h = upsert(vec![], "aapl", 10.0, 100.0, NOW);
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].ticker, "AAPL");
        assert!((h[0].qty - 10.0).abs() < 1e-12);
        assert!((h[0].avg_price - 100.0).abs() < 1e-12);
    }

    #[test]
    fn buys_blend_weighted_average() {
        let h = upsert(vec![], "AAPL", 10.0, 100.0, NOW);
        let h = upsert(h, "AAPL", 10.0, 200.0, NOW);
        assert!((h[0].qty - 20.0).abs() < 1e-12);
        // (10*100 + 10*200) / 20 = 150
        assert!((h[0].avg_price - 150.0).abs() < 1e-12);
    }

    #[test]
    fn sells_keep_average_price() {
        let h = upsert(vec![], "AAPL", 20.0, 150.0, NOW);
        let h = upsert(h, "AAPL", -5.0, 500.0, NOW);
        assert!((h[0].qty - 15.0).abs() < 1e-12);
        assert!((h[0].avg_price - 150.0).abs() < 1e-12);
    }

    #[test]
    fn selling_everything_removes_position() {
        let h = upsert(vec![], "AAPL", 10.0, 100.0, NOW);
        let h = upsert(h, "AAPL", -10.0, 120.0, NOW);
        assert!(h.is_empty());
    }

    #[test]
    fn sell_without_position_is_noop() {
        let h = upsert(vec![], "AAPL", -10.0, 100.0, NOW);
        assert!(h.is_empty());
    }

    #[test]
    fn trade_reason_is_capped() {
        let t = make_trade(
            TradeAction::Buy,
            "aapl",
            5.0,
            101.5,
            &"r".repeat(400),
            NOW,
        );
        assert_eq!(t.ticker, "AAPL");
        assert_eq!(t.reason.len(), 160);
    }

    #[test]
    fn valuation_sums_and_tolerates_missing_prices() {
        let holdings = vec![
            Holding {
                ticker: "AAPL".into(),
                qty: 10.0,
                avg_price: 100.0,
                date_added: NOW.into(),
            },
            Holding {
                ticker: "MSFT".into(),
                qty: 5.0,
                avg_price: 50.0,
                date_added: NOW.into(),
            },
        ];
        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), 110.0);

        let v = valuation(&holdings, &prices);
        assert!((v.market_value - 1_100.0).abs() < 1e-9);
        assert!((v.cost_basis - 1_250.0).abs() < 1e-9);
        assert!((v.unrealized_pnl - 100.0).abs() < 1e-9);
        assert!(v.rows[1].live_price.is_none());
        assert!(v.rows[1].unrealized_pnl.is_none());
    }
}
