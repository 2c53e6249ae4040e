//! Golden-cross entry with a fixed ATR stop and a death-cross exit.
//!
//! Flat → Long when the fast series crosses above the slow one:
//! `fast[i-1] < slow[i-1] && fast[i] >= slow[i]`. A tie on the current bar
//! counts as a cross.
//!
//! Long → Flat on the first of:
//! 1. stop: `close[i] < entry_price - atr_multiple * ATR[entry]`
//! 2. reversal: `fast[i-1] > slow[i-1] && fast[i] <= slow[i]`
//!
//! The stop is checked first, so a bar that both breaks the stop and crosses
//! down is recorded as a stop.

use log::debug;
use serde::{Deserialize, Serialize};

use super::state::PositionState;
use super::{SignalGenerator, SignalOutput};
use crate::domain::{check_timeline, Bar, Intent, TradeKind, TradeRecord};
use crate::error::InputError;
use crate::indicators::{IndicatorValues, ATR, MACD_LINE, MACD_SIGNAL};

/// Strategy parameters not already baked into the indicator series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Stop distance below entry, in ATRs.
    pub atr_multiple: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self { atr_multiple: 3.0 }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), InputError> {
        if !self.atr_multiple.is_finite() || self.atr_multiple <= 0.0 {
            return Err(InputError::InvalidAtrMultiple(self.atr_multiple));
        }
        Ok(())
    }
}

/// Which indicator series play the fast, slow and volatility roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesKeys {
    pub fast: String,
    pub slow: String,
    pub atr: String,
}

impl Default for SeriesKeys {
    fn default() -> Self {
        Self {
            fast: MACD_LINE.to_string(),
            slow: MACD_SIGNAL.to_string(),
            atr: ATR.to_string(),
        }
    }
}

/// Indicator readings for one bar and its predecessor.
#[derive(Debug, Clone, Copy)]
struct BarView {
    close: f64,
    fast_prev: f64,
    slow_prev: f64,
    fast: f64,
    slow: f64,
    atr: f64,
}

impl BarView {
    fn crossover_defined(&self) -> bool {
        !(self.fast_prev.is_nan()
            || self.slow_prev.is_nan()
            || self.fast.is_nan()
            || self.slow.is_nan())
    }

    /// Every value an entry needs is a real number.
    fn entry_defined(&self) -> bool {
        self.crossover_defined() && !self.atr.is_nan() && !self.close.is_nan()
    }

    fn crossed_up(&self) -> bool {
        self.fast_prev < self.slow_prev && self.fast >= self.slow
    }

    fn crossed_down(&self) -> bool {
        self.fast_prev > self.slow_prev && self.fast <= self.slow
    }
}

/// One transition of the state machine.
fn step(
    state: PositionState,
    view: &BarView,
    atr_multiple: f64,
    index: usize,
) -> (PositionState, Intent) {
    match state {
        PositionState::Flat => {
            // Warm-up guard: undefined readings never trigger anything.
            if !view.entry_defined() || !view.crossed_up() {
                return (PositionState::Flat, Intent::Flat);
            }
            let entry_price = view.close;
            let next = PositionState::Long {
                entry_index: index,
                entry_price,
                stop_level: entry_price - atr_multiple * view.atr,
            };
            (next, Intent::EnterLong)
        }
        PositionState::Long { stop_level, .. } => {
            if view.close < stop_level {
                (PositionState::Flat, Intent::ExitByStop)
            } else if view.crossover_defined() && view.crossed_down() {
                (PositionState::Flat, Intent::ExitByReversal)
            } else {
                (state, Intent::Hold)
            }
        }
    }
}

/// MACD golden-cross generator.
#[derive(Debug, Clone)]
pub struct GoldenCross {
    params: StrategyParams,
    keys: SeriesKeys,
}

impl GoldenCross {
    pub fn new(params: StrategyParams) -> Result<Self, InputError> {
        params.validate()?;
        Ok(Self {
            params,
            keys: SeriesKeys::default(),
        })
    }

    /// Read the crossover and ATR from differently named series.
    pub fn with_series(mut self, keys: SeriesKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }
}

impl SignalGenerator for GoldenCross {
    fn name(&self) -> &str {
        "golden_cross"
    }

    fn generate(
        &self,
        bars: &[Bar],
        indicators: &IndicatorValues,
    ) -> Result<SignalOutput, InputError> {
        check_timeline(bars, 2)?;
        let n = bars.len();
        let fast = indicators.require(&self.keys.fast, n)?;
        let slow = indicators.require(&self.keys.slow, n)?;
        let atr = indicators.require(&self.keys.atr, n)?;

        let mut intents = Vec::with_capacity(n);
        let mut states = Vec::with_capacity(n);
        let mut trades = Vec::new();

        // Bar 0 has no predecessor to compare against.
        let mut state = PositionState::Flat;
        intents.push(Intent::Flat);
        states.push(state);

        for i in 1..n {
            let view = BarView {
                close: bars[i].close,
                fast_prev: fast[i - 1],
                slow_prev: slow[i - 1],
                fast: fast[i],
                slow: slow[i],
                atr: atr[i],
            };
            let (next, intent) = step(state, &view, self.params.atr_multiple, i);

            let kind = match intent {
                Intent::EnterLong => Some(TradeKind::Buy),
                Intent::ExitByReversal => Some(TradeKind::Sell),
                Intent::ExitByStop => Some(TradeKind::Stop),
                Intent::Flat | Intent::Hold => None,
            };
            if let Some(kind) = kind {
                debug!(
                    "{} {} at bar {i} ({}) price {:.6}",
                    self.name(),
                    kind.as_str(),
                    bars[i].timestamp,
                    bars[i].close
                );
                trades.push(TradeRecord {
                    kind,
                    bar_index: i,
                    timestamp: bars[i].timestamp,
                    price: bars[i].close,
                    stop_level: next.stop_level().filter(|_| kind == TradeKind::Buy),
                });
            }

            state = next;
            intents.push(intent);
            states.push(state);
        }

        Ok(SignalOutput {
            intents,
            states,
            trades,
        })
    }
}

/// Run the golden-cross machine over MACD/ATR series with default names.
pub fn generate(
    bars: &[Bar],
    indicators: &IndicatorValues,
    params: &StrategyParams,
) -> Result<SignalOutput, InputError> {
    GoldenCross::new(*params)?.generate(bars, indicators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    const NAN: f64 = f64::NAN;

    fn indicators(fast: Vec<f64>, slow: Vec<f64>, atr: Vec<f64>) -> IndicatorValues {
        let mut iv = IndicatorValues::new();
        iv.insert(MACD_LINE, fast);
        iv.insert(MACD_SIGNAL, slow);
        iv.insert(ATR, atr);
        iv
    }

    fn view(fast_prev: f64, slow_prev: f64, fast: f64, slow: f64) -> BarView {
        BarView {
            close: 100.0,
            fast_prev,
            slow_prev,
            fast,
            slow,
            atr: 2.0,
        }
    }

    #[test]
    fn tie_on_current_bar_counts_as_entry() {
        let (state, intent) = step(PositionState::Flat, &view(1.0, 2.0, 2.0, 2.0), 3.0, 4);
        assert_eq!(intent, Intent::EnterLong);
        assert_eq!(state.stop_level(), Some(94.0));
    }

    #[test]
    fn tie_on_previous_bar_is_not_an_entry() {
        let (_, intent) = step(PositionState::Flat, &view(2.0, 2.0, 3.0, 2.0), 3.0, 4);
        assert_eq!(intent, Intent::Flat);
    }

    #[test]
    fn tie_on_current_bar_counts_as_reversal() {
        let long = PositionState::Long {
            entry_index: 1,
            entry_price: 90.0,
            stop_level: 80.0,
        };
        let (state, intent) = step(long, &view(3.0, 2.0, 2.0, 2.0), 3.0, 4);
        assert_eq!(intent, Intent::ExitByReversal);
        assert_eq!(state, PositionState::Flat);
    }

    #[test]
    fn undefined_readings_never_enter() {
        for v in [
            view(NAN, 2.0, 3.0, 2.0),
            view(1.0, NAN, 3.0, 2.0),
            view(1.0, 2.0, NAN, 2.0),
            view(1.0, 2.0, 3.0, NAN),
        ] {
            assert_eq!(step(PositionState::Flat, &v, 3.0, 4).1, Intent::Flat);
        }
        let mut no_atr = view(1.0, 2.0, 3.0, 2.0);
        no_atr.atr = NAN;
        assert_eq!(step(PositionState::Flat, &no_atr, 3.0, 4).1, Intent::Flat);
    }

    #[test]
    fn stop_uses_entry_atr_not_current() {
        // Entry at bar 2 (ATR 1 → stop 97); ATR later jumps but the stop stays.
        let bars = make_bars(&[100.0, 100.0, 100.0, 98.0, 96.0]);
        let iv = indicators(
            vec![0.0, 1.0, 3.0, 4.0, 5.0],
            vec![0.0, 2.0, 2.0, 2.0, 2.0],
            vec![1.0, 1.0, 1.0, 50.0, 50.0],
        );
        let out = generate(&bars, &iv, &StrategyParams { atr_multiple: 3.0 }).unwrap();
        assert_eq!(
            out.intents,
            vec![
                Intent::Flat,
                Intent::Flat,
                Intent::EnterLong,
                Intent::Hold,
                Intent::ExitByStop
            ]
        );
        assert_eq!(out.trades[0].stop_level, Some(97.0));
        assert_eq!(out.trades[1].kind, TradeKind::Stop);
        assert_eq!(out.trades[1].stop_level, None);
    }

    #[test]
    fn reenters_after_exit() {
        let bars = make_bars(&[10.0; 7]);
        let iv = indicators(
            vec![1.0, 3.0, 1.0, 1.0, 3.0, 3.0, 3.0],
            vec![2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0],
            vec![1.0; 7],
        );
        let out = generate(&bars, &iv, &StrategyParams::default()).unwrap();
        assert_eq!(
            out.intents,
            vec![
                Intent::Flat,
                Intent::EnterLong,
                Intent::ExitByReversal,
                Intent::Flat,
                Intent::EnterLong,
                Intent::Hold,
                Intent::Hold
            ]
        );
        let kinds: Vec<TradeKind> = out.trades.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TradeKind::Buy, TradeKind::Sell, TradeKind::Buy]);
        assert_eq!(out.entry_count(), 2);
    }

    #[test]
    fn custom_series_keys() {
        let bars = make_bars(&[10.0, 10.0, 10.0]);
        let mut iv = IndicatorValues::new();
        iv.insert("ema_fast", vec![1.0, 3.0, 3.0]);
        iv.insert("ema_slow", vec![2.0, 2.0, 2.0]);
        iv.insert("vol", vec![1.0, 1.0, 1.0]);
        let gen = GoldenCross::new(StrategyParams::default())
            .unwrap()
            .with_series(SeriesKeys {
                fast: "ema_fast".into(),
                slow: "ema_slow".into(),
                atr: "vol".into(),
            });
        let out = gen.generate(&bars, &iv).unwrap();
        assert_eq!(out.intents[1], Intent::EnterLong);
    }

    #[test]
    fn rejects_non_positive_atr_multiple() {
        for m in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                GoldenCross::new(StrategyParams { atr_multiple: m }),
                Err(InputError::InvalidAtrMultiple(_))
            ));
        }
    }

    #[test]
    fn rejects_misaligned_series() {
        let bars = make_bars(&[10.0, 10.0, 10.0]);
        let iv = indicators(vec![1.0, 2.0], vec![1.0, 2.0, 3.0], vec![1.0; 3]);
        let err = generate(&bars, &iv, &StrategyParams::default()).unwrap_err();
        assert!(matches!(err, InputError::LengthMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn rejects_missing_series() {
        let bars = make_bars(&[10.0, 10.0]);
        let mut iv = IndicatorValues::new();
        iv.insert(MACD_LINE, vec![1.0, 2.0]);
        iv.insert(MACD_SIGNAL, vec![1.0, 2.0]);
        let err = generate(&bars, &iv, &StrategyParams::default()).unwrap_err();
        assert_eq!(err, InputError::MissingIndicator(ATR.into()));
    }
}
