//! GoldX Runner: backtest orchestration on top of `goldx-core`.
//!
//! This crate provides:
//! - TOML configuration with defaults and a deterministic run id
//! - Bar loading from CSV, or a seeded synthetic random walk
//! - Single-backtest runner (indicators → signals → engine → evaluation)
//! - Parallel parameter sweeps ranked by a fitness metric
//! - JSON / CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod fitness;
pub mod runner;
pub mod sweep;

pub use config::{ConfigError, GoldxConfig, RunId};
pub use data_loader::{load_csv, read_bars, synthetic_bars, DataSource, LoadError, LoadedBars};
pub use fitness::FitnessMetric;
pub use runner::{
    run_backtest, run_backtest_from_data, run_loaded, BacktestResult, RunError, SCHEMA_VERSION,
};
pub use sweep::{ParamGrid, ParamSweep, SweepError, SweepResults};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<GoldxConfig>();
        assert_sync::<GoldxConfig>();
        assert_send::<ParamGrid>();
        assert_sync::<ParamGrid>();
    }

    #[test]
    fn sweep_types_are_send_sync() {
        assert_send::<ParamSweep>();
        assert_sync::<ParamSweep>();
        assert_send::<SweepResults>();
        assert_sync::<SweepResults>();
        assert_send::<FitnessMetric>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
        assert_send::<SweepError>();
        assert_sync::<SweepError>();
    }
}
