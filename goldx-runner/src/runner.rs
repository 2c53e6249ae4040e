//! Backtest runner: indicators → signals → engine → evaluation.
//!
//! Two entry points:
//! - `run_backtest()`: bars + config, hashes the bars itself. Used by tests
//!   and library callers.
//! - `run_backtest_from_data()`: pre-loaded bars with known provenance.
//!   Used by the CLI and by parameter sweeps to avoid re-hashing per run.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use goldx_core::domain::{round_trips, Bar, Intent, RoundTrip, TradeRecord};
use goldx_core::engine::{evaluate, run, EquityCurve, PerformanceSummary};
use goldx_core::fingerprint::{dataset_hash, Fingerprint};
use goldx_core::indicators::{IndicatorProvider, MacdAtrProvider};
use goldx_core::signals::{GoldenCross, SignalGenerator};
use goldx_core::InputError;

use crate::config::{ConfigError, GoldxConfig, RunId};
use crate::data_loader::{LoadError, LoadedBars};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("invalid input: {0}")]
    Input(#[from] InputError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub config: GoldxConfig,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub start: String,
    pub end: String,
    pub bar_count: usize,
    /// Leading bars on which the indicators are undefined.
    pub warmup_bars: usize,
    pub bars_in_market: usize,
    pub intents: Vec<Intent>,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: EquityCurve,
    #[serde(with = "goldx_core::serde_nan::vec")]
    pub strategy_returns: Vec<f64>,
    pub summary: PerformanceSummary,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    /// Number of entries (buy fills).
    pub fn entry_count(&self) -> usize {
        self.trades.iter().filter(|t| t.is_entry()).count()
    }

    /// Completed entry/exit pairs.
    pub fn round_trips(&self) -> Vec<RoundTrip> {
        round_trips(&self.trades)
    }

    pub fn final_strategy_equity(&self) -> f64 {
        self.equity_curve
            .final_strategy_equity()
            .unwrap_or(self.config.engine.initial_cash)
    }

    pub fn final_market_equity(&self) -> f64 {
        self.equity_curve
            .final_market_equity()
            .unwrap_or(self.config.engine.initial_cash)
    }
}

/// Run a backtest on bars of unknown provenance.
pub fn run_backtest(bars: &[Bar], config: &GoldxConfig) -> Result<BacktestResult, RunError> {
    run_backtest_from_data(bars, config, &dataset_hash(bars), false)
}

/// Run a backtest on loaded bars, carrying their hash and synthetic tag.
pub fn run_loaded(loaded: &LoadedBars, config: &GoldxConfig) -> Result<BacktestResult, RunError> {
    run_backtest_from_data(
        &loaded.bars,
        config,
        &loaded.dataset_hash,
        loaded.is_synthetic(),
    )
}

/// Run a backtest with pre-loaded data: no I/O.
pub fn run_backtest_from_data(
    bars: &[Bar],
    config: &GoldxConfig,
    dataset_hash: &Fingerprint,
    has_synthetic: bool,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let run_id = config.run_id(dataset_hash)?;

    let provider = MacdAtrProvider::new(config.indicators)?;
    let indicators = provider.compute(bars);
    let generator = GoldenCross::new(config.strategy)?;
    let signals = generator.generate(bars, &indicators)?;

    let backtest = run(bars, &signals.intents, &config.engine)?;
    let summary = evaluate(
        &backtest.equity_curve,
        &backtest.strategy_returns,
        &config.evaluation,
    )?;

    let undefined = summary.undefined_metrics();
    if !undefined.is_empty() {
        warn!(
            "run {}: undefined metrics ({})",
            &run_id[..12],
            undefined.join(", ")
        );
    }
    debug!(
        "run {}: {} bars, {} trades, {} bars in market",
        &run_id[..12],
        bars.len(),
        signals.trades.len(),
        backtest.bars_in_market()
    );

    let result = BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        config: config.clone(),
        dataset_hash: dataset_hash.0.clone(),
        has_synthetic,
        start: bars.first().map(|b| b.timestamp.to_string()).unwrap_or_default(),
        end: bars.last().map(|b| b.timestamp.to_string()).unwrap_or_default(),
        bar_count: bars.len(),
        warmup_bars: provider.warmup_bars().min(bars.len()),
        bars_in_market: backtest.bars_in_market(),
        intents: signals.intents,
        trades: signals.trades,
        equity_curve: backtest.equity_curve,
        strategy_returns: backtest.strategy_returns,
        summary,
    };

    info!(
        "{} on {} bars: {} entries, final equity {:.4}",
        generator.name(),
        result.bar_count,
        result.entry_count(),
        result.final_strategy_equity()
    );
    Ok(result)
}
