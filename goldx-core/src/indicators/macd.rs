//! Moving Average Convergence/Divergence (MACD).
//!
//! MACD line = EMA(close, fast) - EMA(close, slow)
//! Signal line = EMA(MACD line, signal)
//! Histogram = MACD line - signal line
//!
//! All three outputs share one warm-up of `slow + signal - 2` NaN values, so
//! the line and the signal line become defined on the same bar.

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::Bar;

/// Which MACD output an `Indicator` instance exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdOutput {
    Line,
    Signal,
    Histogram,
}

/// The three aligned MACD outputs.
#[derive(Debug, Clone)]
pub(crate) struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    output: MacdOutput,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, output: MacdOutput) -> Self {
        assert!(fast >= 1, "MACD fast period must be >= 1");
        assert!(slow > fast, "MACD slow period must be > fast period");
        assert!(signal >= 1, "MACD signal period must be >= 1");
        let suffix = match output {
            MacdOutput::Line => "line",
            MacdOutput::Signal => "signal",
            MacdOutput::Histogram => "hist",
        };
        Self {
            fast,
            slow,
            signal,
            output,
            name: format!("macd_{suffix}_{fast}_{slow}_{signal}"),
        }
    }

    /// Number of leading NaN values in every output. Callers pass periods
    /// already checked by `Macd::new` or `IndicatorParams::validate`.
    pub(crate) fn warmup(slow: usize, signal: usize) -> usize {
        (slow + signal).saturating_sub(2)
    }

    /// Compute all three outputs over a close series.
    pub(crate) fn compute_series(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
        let n = closes.len();
        let fast_ema = ema_of_series(closes, fast);
        let slow_ema = ema_of_series(closes, slow);
        let line: Vec<f64> = fast_ema
            .iter()
            .zip(&slow_ema)
            .map(|(f, s)| f - s)
            .collect();

        // The raw line is NaN before slow-1; the EMA seeds past that prefix.
        let signal_line = ema_of_series(&line, signal);

        let warmup = Self::warmup(slow, signal).min(n);
        let mut out = MacdSeries {
            line,
            histogram: vec![f64::NAN; n],
            signal: signal_line,
        };
        for i in 0..n {
            if i < warmup {
                out.line[i] = f64::NAN;
                out.signal[i] = f64::NAN;
            } else {
                out.histogram[i] = out.line[i] - out.signal[i];
            }
        }
        out
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        Self::warmup(self.slow, self.signal)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let series = Self::compute_series(&closes, self.fast, self.slow, self.signal);
        match self.output {
            MacdOutput::Line => series.line,
            MacdOutput::Signal => series.signal,
            MacdOutput::Histogram => series.histogram,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn warmup_never_underflows() {
        assert_eq!(Macd::warmup(26, 9), 33);
        assert_eq!(Macd::warmup(1, 0), 0);
        assert_eq!(Macd::warmup(0, 0), 0);
    }

    #[test]
    fn macd_small_periods_known_values() {
        // fast=1 → EMA is the close itself; slow=2 → alpha 2/3, seed SMA(c0,c1)
        // closes: 1, 3, 5, 7
        // slow EMA: [-, 2, 2/3*5 + 1/3*2 = 4, 2/3*7 + 1/3*4 = 6]
        // line: [-, 1, 1, 1]; signal=1 → signal == line; warmup = 2+1-2 = 1
        let series = Macd::compute_series(&[1.0, 3.0, 5.0, 7.0], 1, 2, 1);
        assert!(series.line[0].is_nan());
        assert_approx(series.line[1], 1.0, DEFAULT_EPSILON);
        assert_approx(series.line[3], 1.0, DEFAULT_EPSILON);
        assert_approx(series.signal[3], 1.0, DEFAULT_EPSILON);
        assert_approx(series.histogram[3], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn outputs_share_warmup() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let series = Macd::compute_series(&closes, 12, 26, 9);
        let warmup = Macd::warmup(26, 9);
        assert_eq!(warmup, 33);
        for s in [&series.line, &series.signal, &series.histogram] {
            assert_eq!(s.len(), 80);
            assert_eq!(s.iter().take_while(|v| v.is_nan()).count(), warmup);
            assert!(s[warmup..].iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn rising_prices_give_positive_line() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let line = Macd::new(12, 26, 9, MacdOutput::Line).compute(&bars);
        assert!(line[59] > 0.0);
    }

    #[test]
    fn short_input_is_all_nan() {
        let series = Macd::compute_series(&[1.0, 2.0, 3.0], 12, 26, 9);
        assert!(series.line.iter().all(|v| v.is_nan()));
        assert!(series.signal.iter().all(|v| v.is_nan()));
    }

    #[test]
    #[should_panic(expected = "slow period must be > fast")]
    fn rejects_inverted_periods() {
        Macd::new(26, 12, 9, MacdOutput::Line);
    }
}
