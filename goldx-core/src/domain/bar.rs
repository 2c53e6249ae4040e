//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// OHLCV bar for a single instrument over one period.
///
/// The bar sequence handed to the generator and the engine is the single
/// source of truth for time alignment: every derived series has exactly one
/// value per bar at the same index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Optional for the core; loaders fill 0.0 when the column is absent.
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Whether the prices describe a tradable bar: every price finite and
    /// positive, with `low..=high` enclosing both open and close.
    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0)
            && self.low <= self.open.min(self.close)
            && self.high >= self.open.max(self.close)
    }
}

/// Validate the shape of a bar sequence: at least `min_len` bars with
/// strictly increasing timestamps.
pub fn check_timeline(bars: &[Bar], min_len: usize) -> Result<(), InputError> {
    if bars.len() < min_len {
        return Err(InputError::TooFewBars {
            min: min_len,
            actual: bars.len(),
        });
    }
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(InputError::NonMonotonicTimestamp {
                index: i + 1,
                prev_index: i,
                previous: pair[0].timestamp,
                current: pair[1].timestamp,
            });
        }
    }
    Ok(())
}

/// Close prices as a plain vector, index-aligned with `bars`.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
