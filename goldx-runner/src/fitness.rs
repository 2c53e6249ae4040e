//! Fitness function: configurable metric selector for ranking sweep runs.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::runner::BacktestResult;

/// Which metric to optimize/sort by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMetric {
    #[default]
    Sharpe,
    AnnualizedReturn,
    WinRate,
    MaxDrawdown,
    FinalEquity,
}

impl FitnessMetric {
    pub const ALL: [FitnessMetric; 5] = [
        Self::Sharpe,
        Self::AnnualizedReturn,
        Self::WinRate,
        Self::MaxDrawdown,
        Self::FinalEquity,
    ];

    /// Extract the relevant metric value from a result.
    pub fn extract(&self, result: &BacktestResult) -> f64 {
        let s = &result.summary;
        match self {
            Self::Sharpe => s.sharpe_ratio,
            Self::AnnualizedReturn => s.annualized_return,
            Self::WinRate => s.win_rate,
            Self::MaxDrawdown => s.max_drawdown,
            Self::FinalEquity => result.final_strategy_equity(),
        }
    }

    /// Best-first ordering: higher wins for every metric, so a -0.05
    /// drawdown beats -0.20. NaN scores sort after every defined score.
    pub fn compare(&self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sharpe => "sharpe",
            Self::AnnualizedReturn => "annualized-return",
            Self::WinRate => "win-rate",
            Self::MaxDrawdown => "max-drawdown",
            Self::FinalEquity => "final-equity",
        }
    }
}

impl fmt::Display for FitnessMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitnessMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|m| m.as_str()).collect();
                format!("unknown metric '{s}' (expected one of: {})", names.join(", "))
            })
    }
}
