// =============================================================================
// Signal Engine Module
// =============================================================================
//
// Metric pipeline for turning a price/volume series into a trading signal:
// - Rolling-volatility trap strength (Z)
// - Binned Shannon entropy flow (Sigma)
// - Composite gate = (1 - Z) * Sigma
// - Phase classification, rise score, and bullseye confirmation

pub mod engine;
pub mod entropy;
pub mod volatility;

pub use engine::{MetricSnapshot, SignalEngine};
