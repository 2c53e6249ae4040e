//! Signal generation: bars + indicator series in, one intent per bar out.
//!
//! Generators are pure: the same inputs always give the same intents and
//! trade log, and nothing survives between calls. That is what makes
//! parameter sweeps safe to run in parallel.

pub mod golden_cross;
pub mod state;

pub use golden_cross::{generate, GoldenCross, SeriesKeys, StrategyParams};
pub use state::PositionState;

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Intent, TradeRecord};
use crate::error::InputError;
use crate::indicators::IndicatorValues;

/// Everything one generator pass produces, index-aligned with the bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalOutput {
    pub intents: Vec<Intent>,
    /// Position state after each bar was processed.
    pub states: Vec<PositionState>,
    pub trades: Vec<TradeRecord>,
}

impl SignalOutput {
    pub fn entry_count(&self) -> usize {
        self.trades.iter().filter(|t| t.is_entry()).count()
    }
}

/// Maps bars and precomputed indicators to a per-bar intent series.
///
/// # Invariants
/// - `intents.len() == bars.len()`
/// - deterministic for identical inputs
/// - trade records only at state transitions
pub trait SignalGenerator: Send + Sync {
    /// Name for logs and result metadata.
    fn name(&self) -> &str;

    fn generate(
        &self,
        bars: &[Bar],
        indicators: &IndicatorValues,
    ) -> Result<SignalOutput, InputError>;
}
