// =============================================================================
// Shared types used across the Trapgate engine
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Discrete trading signal produced by the signal engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Wait,
}

impl Default for Signal {
    fn default() -> Self {
        Self::Wait
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
            Self::Wait => write!(f, "WAIT"),
        }
    }
}

/// Whether the engine runs its periodic scan loop, idles, or is shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingMode {
    Live,
    Paused,
    Killed,
}

impl Default for TradingMode {
    fn default() -> Self {
        Self::Paused
    }
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "Live"),
            Self::Paused => write!(f, "Paused"),
            Self::Killed => write!(f, "Killed"),
        }
    }
}

/// One bar of a daily price history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricePoint {
    /// Epoch milliseconds of the bar date.
    pub at: i64,
    pub close: f64,
    pub volume: f64,
}

/// Chronological close/volume series for a single instrument.
///
/// Owned by the caller for the duration of one evaluation call; the engine
/// never retains a reference to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            ticker: ticker.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.volume).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    /// Reject series the metric pipeline cannot sanitize.
    ///
    /// A zero close is acceptable (its log return is sanitized to 0), but a
    /// NaN/inf close or volume has no defined treatment and must surface as
    /// `InvalidInput` rather than be coerced into a WAIT.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.points.is_empty() {
            return Err(EngineError::invalid("empty price series"));
        }
        for (i, p) in self.points.iter().enumerate() {
            if !p.close.is_finite() {
                return Err(EngineError::invalid(format!(
                    "non-finite close at index {i}"
                )));
            }
            if !p.volume.is_finite() {
                return Err(EngineError::invalid(format!(
                    "non-finite volume at index {i}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(close: f64, volume: f64) -> PricePoint {
        PricePoint {
            at: 0,
            close,
            volume,
        }
    }

    #[test]
    fn signal_display() {
        assert_eq!(format!("{}", Signal::Buy), "BUY");
        assert_eq!(format!("{}", Signal::Wait), "WAIT");
    }

    #[test]
    fn validate_accepts_zero_close() {
        let s = PriceSeries::new("TEST", vec![point(0.0, 10.0), point(1.0, 10.0)]);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty() {
        let s = PriceSeries::new("TEST", vec![]);
        assert!(matches!(
            s.validate(),
            Err(crate::error::EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn validate_rejects_nan_close() {
        let s = PriceSeries::new("TEST", vec![point(1.0, 10.0), point(f64::NAN, 10.0)]);
        assert!(s.validate().is_err());
    }

    #[test]
    fn validate_rejects_infinite_volume() {
        let s = PriceSeries::new("TEST", vec![point(1.0, f64::INFINITY)]);
        assert!(s.validate().is_err());
    }
}
