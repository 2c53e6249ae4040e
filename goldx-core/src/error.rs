//! Input validation errors shared by the signal generator and the engine.
//!
//! Every variant is fatal to the run: a pipeline that hits one of these never
//! produces partial intents, trades or equity. Degenerate *metrics* (zero
//! variance, no exposure) are not errors; they surface as NaN in
//! `PerformanceSummary`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("need at least {min} bars, got {actual}")]
    TooFewBars { min: usize, actual: usize },

    #[error("series '{name}' has length {actual}, expected {expected} (one value per bar)")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("indicator series '{0}' is missing")]
    MissingIndicator(String),

    #[error("timestamps must be strictly increasing: bar {index} ({current}) is not after bar {prev_index} ({previous})")]
    NonMonotonicTimestamp {
        index: usize,
        prev_index: usize,
        previous: chrono::NaiveDateTime,
        current: chrono::NaiveDateTime,
    },

    #[error("bar {index} has a non-positive or undefined close ({close})")]
    InvalidClose { index: usize, close: f64 },

    #[error("atr_multiple must be finite and > 0, got {0}")]
    InvalidAtrMultiple(f64),

    #[error("initial_cash must be finite and > 0, got {0}")]
    InvalidInitialCash(f64),

    #[error("commission_rate must be in [0, 1), got {0}")]
    InvalidCommission(f64),

    #[error("invalid indicator parameters: {0}")]
    InvalidIndicatorParams(String),

    #[error("periods_per_year must be finite and > 0, got {0}")]
    InvalidPeriodsPerYear(f64),
}
