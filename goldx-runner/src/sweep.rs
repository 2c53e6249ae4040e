//! Parameter sweep over MACD lookbacks, ATR period and stop multiple.
//!
//! Every grid point is an independent run over the same bars; runs share no
//! state, so they are spread across the rayon pool unless parallelism is
//! switched off.

use std::collections::HashMap;

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GoldxConfig;
use crate::data_loader::LoadedBars;
use crate::fitness::FitnessMetric;
use crate::runner::{run_loaded, BacktestResult, RunError};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("parameter grid has no valid combinations")]
    EmptyGrid,
    #[error(transparent)]
    Run(#[from] RunError),
}

/// Parameter grid specification. Each field lists the values to try.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub macd_fast: Vec<usize>,
    pub macd_slow: Vec<usize>,
    pub macd_signal: Vec<usize>,
    pub atr_period: Vec<usize>,
    pub atr_multiple: Vec<f64>,
}

impl Default for ParamGrid {
    /// Classic 12/26/9 plus a faster 8/21/5 variant, stops at 2–4 ATR.
    fn default() -> Self {
        Self {
            macd_fast: vec![8, 12],
            macd_slow: vec![21, 26],
            macd_signal: vec![5, 9],
            atr_period: vec![14],
            atr_multiple: vec![2.0, 2.5, 3.0, 4.0],
        }
    }
}

impl ParamGrid {
    /// Cartesian size, before invalid combinations are removed.
    pub fn size(&self) -> usize {
        self.macd_fast.len()
            * self.macd_slow.len()
            * self.macd_signal.len()
            * self.atr_period.len()
            * self.atr_multiple.len()
    }

    /// All valid configurations in the grid, each derived from `base`.
    ///
    /// Combinations with `fast >= slow`, zero periods or a non-positive
    /// multiple are skipped.
    pub fn generate_configs(&self, base: &GoldxConfig) -> Vec<GoldxConfig> {
        let mut configs = Vec::new();

        for &fast in &self.macd_fast {
            for &slow in &self.macd_slow {
                if fast >= slow {
                    continue;
                }
                for &signal in &self.macd_signal {
                    for &atr_period in &self.atr_period {
                        for &multiple in &self.atr_multiple {
                            let mut config = GoldxConfig {
                                sweep: None,
                                ..base.clone()
                            };
                            config.indicators.macd_fast = fast;
                            config.indicators.macd_slow = slow;
                            config.indicators.macd_signal = signal;
                            config.indicators.atr_period = atr_period;
                            config.strategy.atr_multiple = multiple;

                            if config.validate().is_ok() {
                                configs.push(config);
                            }
                        }
                    }
                }
            }
        }

        configs
    }
}

/// Parameter sweep executor.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every grid configuration on `data`. The first failing run aborts
    /// the sweep. Each result inherits the data's provenance.
    pub fn sweep(
        &self,
        data: &LoadedBars,
        grid: &ParamGrid,
        base: &GoldxConfig,
    ) -> Result<SweepResults, SweepError> {
        self.sweep_with_progress(data, grid, base, |_, _, _| {})
    }

    /// Like [`sweep`](Self::sweep), invoking the callback after each run with
    /// (config index, total configs, result). Under parallel execution the
    /// callback order is unspecified.
    pub fn sweep_with_progress<F>(
        &self,
        data: &LoadedBars,
        grid: &ParamGrid,
        base: &GoldxConfig,
        progress_callback: F,
    ) -> Result<SweepResults, SweepError>
    where
        F: Fn(usize, usize, &BacktestResult) + Send + Sync,
    {
        let configs = grid.generate_configs(base);
        if configs.is_empty() {
            return Err(SweepError::EmptyGrid);
        }
        let total = configs.len();
        info!(
            "sweeping {total} configurations ({} skipped) over {} bars",
            grid.size() - total,
            data.bars.len()
        );

        let run_one = |(idx, config): (usize, &GoldxConfig)| -> Result<BacktestResult, RunError> {
            let result = run_loaded(data, config)?;
            progress_callback(idx, total, &result);
            Ok(result)
        };

        let results: Vec<BacktestResult> = if self.parallel {
            configs
                .par_iter()
                .enumerate()
                .map(run_one)
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .iter()
                .enumerate()
                .map(run_one)
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults::new(results))
    }
}

/// Results from a parameter sweep, in grid order.
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();

        Self {
            results,
            by_run_id,
        }
    }

    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    /// Best first by `metric`; undefined scores last, ties in grid order.
    pub fn ranked(&self, metric: FitnessMetric) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| metric.compare(metric.extract(a), metric.extract(b)));
        sorted
    }

    pub fn top_n(&self, metric: FitnessMetric, n: usize) -> Vec<&BacktestResult> {
        self.ranked(metric).into_iter().take(n).collect()
    }

    /// Best result, if any scored a defined value.
    pub fn best(&self, metric: FitnessMetric) -> Option<&BacktestResult> {
        self.ranked(metric)
            .into_iter()
            .next()
            .filter(|r| !metric.extract(r).is_nan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::synthetic_bars;

    fn small_grid() -> ParamGrid {
        ParamGrid {
            macd_fast: vec![8, 12],
            macd_slow: vec![26],
            macd_signal: vec![9],
            atr_period: vec![14],
            atr_multiple: vec![2.0, 3.0],
        }
    }

    #[test]
    fn grid_size_is_cartesian() {
        assert_eq!(small_grid().size(), 4);
        assert_eq!(ParamGrid::default().size(), 2 * 2 * 2 * 4);
    }

    #[test]
    fn grid_filters_invalid_combinations() {
        let grid = ParamGrid {
            macd_fast: vec![10, 26, 40],
            macd_slow: vec![26, 50],
            macd_signal: vec![9],
            atr_period: vec![14],
            atr_multiple: vec![3.0, -1.0],
        };
        let configs = grid.generate_configs(&GoldxConfig::default());

        // Valid (fast, slow): (10,26), (10,50), (26,50), (40,50); negative multiple dropped.
        assert_eq!(configs.len(), 4);
        for c in &configs {
            assert!(c.indicators.macd_fast < c.indicators.macd_slow);
            assert_eq!(c.strategy.atr_multiple, 3.0);
            assert!(c.sweep.is_none());
        }
    }

    #[test]
    fn grid_keeps_base_engine_settings() {
        let mut base = GoldxConfig::default();
        base.engine.initial_cash = 10_000.0;
        for c in small_grid().generate_configs(&base) {
            assert_eq!(c.engine.initial_cash, 10_000.0);
        }
    }

    #[test]
    fn empty_grid_is_an_error() {
        let loaded = synthetic_bars(100, 1);
        let grid = ParamGrid {
            macd_fast: vec![30],
            macd_slow: vec![26],
            ..small_grid()
        };
        let err = ParamSweep::new()
            .sweep(&loaded, &grid, &GoldxConfig::default())
            .unwrap_err();
        assert!(matches!(err, SweepError::EmptyGrid));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let loaded = synthetic_bars(400, 9);
        let base = GoldxConfig::default();
        let par = ParamSweep::new()
            .sweep(&loaded, &small_grid(), &base)
            .unwrap();
        let seq = ParamSweep::new()
            .with_parallelism(false)
            .sweep(&loaded, &small_grid(), &base)
            .unwrap();

        assert_eq!(par.len(), 4);
        assert_eq!(seq.len(), 4);
        assert!(par.all().iter().all(|r| r.has_synthetic));
        for (a, b) in par.all().iter().zip(seq.all()) {
            assert_eq!(a.run_id, b.run_id);
            assert_eq!(a.intents, b.intents);
        }
        let id = &par.all()[2].run_id;
        assert_eq!(par.get(id).map(|r| &r.run_id), Some(id));
    }

    #[test]
    fn ranking_is_best_first_with_nan_last() {
        let loaded = synthetic_bars(400, 21);
        let results = ParamSweep::new()
            .sweep(
                &loaded,
                &small_grid(),
                &GoldxConfig::default(),
            )
            .unwrap();

        for metric in FitnessMetric::ALL {
            let ranked = results.ranked(metric);
            assert_eq!(ranked.len(), 4);
            for pair in ranked.windows(2) {
                let (a, b) = (metric.extract(pair[0]), metric.extract(pair[1]));
                assert!(b.is_nan() || (!a.is_nan() && a >= b));
            }
        }
        assert_eq!(results.top_n(FitnessMetric::FinalEquity, 2).len(), 2);
    }

    #[test]
    fn progress_callback_sees_every_run() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let loaded = synthetic_bars(200, 4);
        let seen = AtomicUsize::new(0);
        ParamSweep::new()
            .sweep_with_progress(
                &loaded,
                &small_grid(),
                &GoldxConfig::default(),
                |_, total, _| {
                    assert_eq!(total, 4);
                    seen.fetch_add(1, Ordering::Relaxed);
                },
            )
            .unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 4);
    }
}
