//! Vectorised long-only backtest over a per-bar intent series.
//!
//! position[i]  = 1 while the intent is long (EnterLong / Hold), else 0
//! applied[i]   = position[i-1], applied[0] = 0
//! market[i]    = close[i] / close[i-1] - 1, NaN at i = 0
//! strategy[i]  = applied[i] * market[i] - commission * |applied[i] - applied[i-1]|
//! equity[i]    = initial_cash * prod_{k<=i} (1 + r[k]), r[0] taken as 0
//!
//! The one-bar lag models "decide at the close, hold from the next bar on":
//! a position decided at bar i earns the return realised over bar i → i+1.

use serde::{Deserialize, Serialize};

use super::equity::{EquityCurve, EquityPoint};
use crate::domain::{check_timeline, Bar, Intent};
use crate::error::InputError;

/// Portfolio simulation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_cash: f64,
    /// Flat fraction of equity charged per unit change in exposure.
    pub commission_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cash: 1.0,
            commission_rate: 0.0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), InputError> {
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(InputError::InvalidInitialCash(self.initial_cash));
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err(InputError::InvalidCommission(self.commission_rate));
        }
        Ok(())
    }
}

/// Derived per-bar series of one backtest. All vectors are bar-aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRun {
    pub equity_curve: EquityCurve,
    /// Exposure decided at each bar's close.
    pub positions: Vec<f64>,
    /// Exposure actually earning the bar's return (positions shifted by one).
    pub applied_positions: Vec<f64>,
    #[serde(with = "crate::serde_nan::vec")]
    pub market_returns: Vec<f64>,
    #[serde(with = "crate::serde_nan::vec")]
    pub strategy_returns: Vec<f64>,
}

impl BacktestRun {
    /// Number of bars with non-zero applied exposure.
    pub fn bars_in_market(&self) -> usize {
        self.applied_positions.iter().filter(|p| **p > 0.0).count()
    }
}

/// Shift an exposure series one bar later; the first bar is always flat.
pub fn lagged(positions: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(positions.len());
    if !positions.is_empty() {
        out.push(0.0);
        out.extend_from_slice(&positions[..positions.len() - 1]);
    }
    out
}

/// Simple returns of a close series; NaN at index 0.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; closes.len()];
    for i in 1..closes.len() {
        out[i] = closes[i] / closes[i - 1] - 1.0;
    }
    out
}

/// Compound a return series into an equity curve. NaN returns count as 0.
pub fn compound(initial: f64, returns: &[f64]) -> Vec<f64> {
    let mut equity = initial;
    returns
        .iter()
        .map(|r| {
            if !r.is_nan() {
                equity *= 1.0 + r;
            }
            equity
        })
        .collect()
}

pub fn run(bars: &[Bar], intents: &[Intent], config: &EngineConfig) -> Result<BacktestRun, InputError> {
    config.validate()?;
    check_timeline(bars, 2)?;
    if intents.len() != bars.len() {
        return Err(InputError::LengthMismatch {
            name: "intents".into(),
            expected: bars.len(),
            actual: intents.len(),
        });
    }
    if let Some((index, bar)) = bars
        .iter()
        .enumerate()
        .find(|(_, b)| !b.close.is_finite() || b.close <= 0.0)
    {
        return Err(InputError::InvalidClose {
            index,
            close: bar.close,
        });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let positions: Vec<f64> = intents.iter().map(Intent::exposure).collect();
    let applied = lagged(&positions);
    let market_returns = simple_returns(&closes);

    let mut strategy_returns = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        let turnover = (applied[i] - applied[i - 1]).abs();
        strategy_returns[i] = applied[i] * market_returns[i] - config.commission_rate * turnover;
    }

    let strategy_equity = compound(config.initial_cash, &strategy_returns);
    let market_equity = compound(config.initial_cash, &market_returns);

    let points = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| EquityPoint {
            timestamp: bar.timestamp,
            strategy_equity: strategy_equity[i],
            market_equity: market_equity[i],
            exposure: applied[i],
        })
        .collect();

    Ok(BacktestRun {
        equity_curve: EquityCurve::new(points),
        positions,
        applied_positions: applied,
        market_returns,
        strategy_returns,
    })
}
