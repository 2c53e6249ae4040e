//! Equity curve: one row per bar, derived by the engine.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub strategy_equity: f64,
    pub market_equity: f64,
    /// Exposure that earned this bar's return (0.0 or 1.0).
    pub exposure: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn new(points: Vec<EquityPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn strategy_equity(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.strategy_equity).collect()
    }

    pub fn market_equity(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.market_equity).collect()
    }

    /// Whether the strategy was ever exposed to the market.
    pub fn had_exposure(&self) -> bool {
        self.points.iter().any(|p| p.exposure > 0.0)
    }

    pub fn final_strategy_equity(&self) -> Option<f64> {
        self.points.last().map(|p| p.strategy_equity)
    }

    pub fn final_market_equity(&self) -> Option<f64> {
        self.points.last().map(|p| p.market_equity)
    }
}
