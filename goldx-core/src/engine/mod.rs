//! Backtesting engine: turns an intent series into equity curves and
//! summary statistics.
//!
//! Both halves are pure functions of their inputs and keep no state between
//! calls, so any number of runs can be evaluated concurrently.

pub mod backtest;
pub mod equity;
pub mod evaluate;

pub use backtest::{compound, lagged, run, simple_returns, BacktestRun, EngineConfig};
pub use equity::{EquityCurve, EquityPoint};
pub use evaluate::{evaluate, EvaluationConfig, PerformanceSummary};
