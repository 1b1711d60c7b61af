// =============================================================================
// Engine Error Taxonomy
// =============================================================================
//
// Only two outcomes are ever visible to callers as errors:
//
//   InvalidInput          — the series/payload is malformed (empty, non-finite
//                           values that cannot be sanitized). Must never be
//                           silently coerced into a WAIT signal.
//   DataSourceUnavailable — an external provider failed or returned nothing.
//                           Surfaced as "no data for this instrument".
//
// Everything else is resolved locally to defined defaults: a series shorter
// than the evaluation window produces a neutral WAIT snapshot (see
// `MetricSnapshot::neutral`), and a zero normalization range resolves to
// zero-signal rather than propagating.

use thiserror::Error;

/// Caller-visible failures of the signal engine and its providers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input that cannot be sanitized into a usable series.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The external history/news provider failed or returned empty.
    #[error("data source unavailable: {0}")]
    DataSourceUnavailable(String),
}

impl EngineError {
    /// Convenience constructor used by the provider clients.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::DataSourceUnavailable(msg.into())
    }

    /// Convenience constructor used by input validation.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
