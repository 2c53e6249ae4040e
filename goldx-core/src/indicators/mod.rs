//! Indicator boundary: the `Indicator` trait, the precomputed `IndicatorValues`
//! container, and the `IndicatorProvider` contract the signal generator reads.
//!
//! Indicators are pure functions: bar history in, one value per bar out, with
//! a known prefix of NaN warm-up values. No value at bar t may depend on bars
//! after t.

pub mod atr;
pub mod ema;
pub mod macd;

pub use atr::Atr;
pub use ema::Ema;
pub use macd::{Macd, MacdOutput};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::Bar;
use crate::error::InputError;

/// Well-known series names produced by [`MacdAtrProvider`].
pub const MACD_LINE: &str = "macd";
pub const MACD_SIGNAL: &str = "macd_signal";
pub const MACD_HIST: &str = "macd_hist";
pub const ATR: &str = "atr";

/// Single-series indicator.
///
/// `compute` returns a `Vec<f64>` of the same length as `bars`; the first
/// `lookback()` values are `f64::NAN`.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_12", "atr_14").
    fn name(&self) -> &str;

    /// Number of leading NaN values in the output.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Named, bar-aligned indicator series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Value at a bar index. `None` if the series is missing or too short.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(bar_index).copied())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// Fetch a series that must exist and carry exactly one value per bar.
    pub fn require(&self, name: &str, bar_count: usize) -> Result<&[f64], InputError> {
        let series = self
            .get_series(name)
            .ok_or_else(|| InputError::MissingIndicator(name.to_string()))?;
        if series.len() != bar_count {
            return Err(InputError::LengthMismatch {
                name: name.to_string(),
                expected: bar_count,
                actual: series.len(),
            });
        }
        Ok(series)
    }

    /// Number of series stored.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Series names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.series.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Source of the indicator series a strategy needs.
///
/// Implementations must be deterministic and return series aligned to `bars`.
pub trait IndicatorProvider: Send + Sync {
    fn compute(&self, bars: &[Bar]) -> IndicatorValues;

    /// Leading bars for which at least one produced series is undefined.
    fn warmup_bars(&self) -> usize;
}

/// Lookback parameters for the MACD and ATR indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
        }
    }
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<(), InputError> {
        if self.macd_fast == 0 || self.macd_signal == 0 || self.atr_period == 0 {
            return Err(InputError::InvalidIndicatorParams(format!(
                "periods must be >= 1 (fast={}, signal={}, atr={})",
                self.macd_fast, self.macd_signal, self.atr_period
            )));
        }
        if self.macd_slow <= self.macd_fast {
            return Err(InputError::InvalidIndicatorParams(format!(
                "macd_slow ({}) must be greater than macd_fast ({})",
                self.macd_slow, self.macd_fast
            )));
        }
        Ok(())
    }
}

/// MACD (line, signal, histogram) plus ATR, under the names
/// [`MACD_LINE`], [`MACD_SIGNAL`], [`MACD_HIST`] and [`ATR`].
#[derive(Debug, Clone)]
pub struct MacdAtrProvider {
    params: IndicatorParams,
}

impl MacdAtrProvider {
    pub fn new(params: IndicatorParams) -> Result<Self, InputError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }
}

impl IndicatorProvider for MacdAtrProvider {
    fn compute(&self, bars: &[Bar]) -> IndicatorValues {
        let p = &self.params;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let macd = Macd::compute_series(&closes, p.macd_fast, p.macd_slow, p.macd_signal);

        let mut values = IndicatorValues::new();
        values.insert(MACD_LINE, macd.line);
        values.insert(MACD_SIGNAL, macd.signal);
        values.insert(MACD_HIST, macd.histogram);
        values.insert(ATR, Atr::new(p.atr_period).compute(bars));
        values
    }

    fn warmup_bars(&self) -> usize {
        let p = &self.params;
        Macd::warmup(p.macd_slow, p.macd_signal).max(p.atr_period)
    }
}

/// Synthetic bars from close prices: open = previous close,
/// high/low = max/min(open, close) ± 1.0, daily timestamps.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar::new(
                base + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}

#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Bar::new(base + chrono::Duration::days(i as i64), open, high, low, close, 1000.0)
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
