//! Performance summary: pure functions over the equity curve and the
//! per-bar strategy returns.
//!
//! Degenerate inputs (no exposure, zero variance, empty series) are not
//! errors: the affected metric is NaN so callers can tell "ran, never traded"
//! apart from a failed run.

use serde::{Deserialize, Serialize};

use super::equity::EquityCurve;
use crate::error::InputError;

/// Annualisation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Bars per year: 252 for daily equity bars, 365 for daily crypto, etc.
    pub periods_per_year: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 252.0,
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<(), InputError> {
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(InputError::InvalidPeriodsPerYear(self.periods_per_year));
        }
        Ok(())
    }
}

/// Headline statistics for one run. NaN marks an undefined metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    #[serde(with = "crate::serde_nan")]
    pub win_rate: f64,
    #[serde(with = "crate::serde_nan")]
    pub annualized_return: f64,
    #[serde(with = "crate::serde_nan")]
    pub sharpe_ratio: f64,
    #[serde(with = "crate::serde_nan")]
    pub max_drawdown: f64,
}

impl PerformanceSummary {
    /// Names of the metrics that came out undefined.
    pub fn undefined_metrics(&self) -> Vec<&'static str> {
        [
            ("win_rate", self.win_rate),
            ("annualized_return", self.annualized_return),
            ("sharpe_ratio", self.sharpe_ratio),
            ("max_drawdown", self.max_drawdown),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_nan())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Summarise a run. Fails only on an invalid `config`; undefined metrics
/// come back as NaN.
///
/// Win rate is undefined until some bar actually earned a lagged return. An
/// entry on the final bar is logged as a trade but never exposed, so a run
/// whose only entry is its last bar still reports NaN.
pub fn evaluate(
    curve: &EquityCurve,
    strategy_returns: &[f64],
    config: &EvaluationConfig,
) -> Result<PerformanceSummary, InputError> {
    config.validate()?;
    let returns: Vec<f64> = strategy_returns
        .iter()
        .copied()
        .filter(|r| !r.is_nan())
        .collect();

    let win_rate = if curve.had_exposure() {
        win_rate(&returns)
    } else {
        f64::NAN
    };

    Ok(PerformanceSummary {
        win_rate,
        annualized_return: annualized_return(&returns, config.periods_per_year),
        sharpe_ratio: sharpe_ratio(&returns, config.periods_per_year),
        max_drawdown: max_drawdown(&curve.strategy_equity()),
    })
}

// ─── Individual metric functions ────────────────────────────────────

/// Share of strictly positive returns. Zero returns count as non-wins.
pub fn win_rate(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return f64::NAN;
    }
    returns.iter().filter(|r| **r > 0.0).count() as f64 / returns.len() as f64
}

pub fn annualized_return(returns: &[f64], periods_per_year: f64) -> f64 {
    mean(returns) * periods_per_year
}

/// mean / sample std * sqrt(periods_per_year). NaN when std is zero or
/// there are fewer than two returns.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    let std = std_dev(returns);
    if std.is_nan() || std < 1e-15 {
        return f64::NAN;
    }
    mean(returns) / std * periods_per_year.sqrt()
}

/// Deepest fall from the running peak, as a non-positive fraction.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            worst = worst.min(eq / peak - 1.0);
        }
    }
    worst
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
