//! Property tests for the signal machine and the engine.
//!
//! Uses proptest to verify:
//! 1. Shape: one intent and one state per bar, bar 0 always Flat
//! 2. Transitions: the intent sequence is a legal walk of the state machine
//! 3. Determinism: the same inputs give the same outputs
//! 4. Stops: a stop exit only happens below the level fixed at entry
//! 5. Engine: lagged exposure, drawdown sign, flat strategy keeps its cash

use chrono::NaiveDate;
use goldx_core::domain::{Bar, Intent, TradeKind};
use goldx_core::engine::evaluate::max_drawdown;
use goldx_core::engine::{evaluate, lagged, run, EngineConfig, EvaluationConfig};
use goldx_core::indicators::{IndicatorValues, ATR, MACD_LINE, MACD_SIGNAL};
use goldx_core::signals::{generate, PositionState, StrategyParams};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn bars_from(closes: &[f64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2020, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            Bar::new(
                base + chrono::Duration::days(i as i64),
                c,
                c * 1.01,
                c * 0.99,
                c,
                0.0,
            )
        })
        .collect()
}

fn arb_reading() -> impl Strategy<Value = f64> {
    prop_oneof![
        1 => Just(f64::NAN),
        8 => (-3.0..3.0_f64).prop_map(|v| (v * 4.0).round() / 4.0),
    ]
}

/// Bars plus fast/slow/ATR series of matching length.
fn arb_case() -> impl Strategy<Value = (Vec<Bar>, IndicatorValues)> {
    (2usize..80).prop_flat_map(|n| {
        (
            prop::collection::vec(50.0..150.0_f64, n),
            prop::collection::vec(arb_reading(), n),
            prop::collection::vec(arb_reading(), n),
            prop::collection::vec(0.1..5.0_f64, n),
        )
            .prop_map(|(closes, fast, slow, atr)| {
                let mut iv = IndicatorValues::new();
                iv.insert(MACD_LINE, fast);
                iv.insert(MACD_SIGNAL, slow);
                iv.insert(ATR, atr);
                (bars_from(&closes), iv)
            })
    })
}

fn arb_multiple() -> impl Strategy<Value = f64> {
    (0.5..5.0_f64).prop_map(|m| (m * 10.0).round() / 10.0)
}

// ── 1. Shape ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn one_intent_per_bar((bars, iv) in arb_case(), m in arb_multiple()) {
        let out = generate(&bars, &iv, &StrategyParams { atr_multiple: m }).unwrap();
        prop_assert_eq!(out.intents.len(), bars.len());
        prop_assert_eq!(out.states.len(), bars.len());
        prop_assert_eq!(out.intents[0], Intent::Flat);
    }
}

// ── 2. Transitions ───────────────────────────────────────────────────

proptest! {
    /// EnterLong only from Flat; Hold and exits only from Long; the state
    /// after each bar agrees with that bar's intent.
    #[test]
    fn intents_walk_the_state_machine((bars, iv) in arb_case(), m in arb_multiple()) {
        let out = generate(&bars, &iv, &StrategyParams { atr_multiple: m }).unwrap();
        for i in 1..bars.len() {
            let was_long = out.states[i - 1].is_long();
            match out.intents[i] {
                Intent::Flat | Intent::EnterLong => {
                    prop_assert!(!was_long, "bar {}", i);
                }
                Intent::Hold | Intent::ExitByReversal | Intent::ExitByStop => {
                    prop_assert!(was_long, "bar {}", i);
                }
            }
            prop_assert_eq!(out.states[i].is_long(), out.intents[i].is_long());
        }
    }

    /// Trades are exactly the transition bars, alternating buy / exit.
    #[test]
    fn trades_mirror_transitions((bars, iv) in arb_case(), m in arb_multiple()) {
        let out = generate(&bars, &iv, &StrategyParams { atr_multiple: m }).unwrap();
        let transitions: Vec<usize> = out
            .intents
            .iter()
            .enumerate()
            .filter(|(_, i)| i.is_transition())
            .map(|(idx, _)| idx)
            .collect();
        let trade_bars: Vec<usize> = out.trades.iter().map(|t| t.bar_index).collect();
        prop_assert_eq!(trade_bars, transitions);
        for (k, trade) in out.trades.iter().enumerate() {
            prop_assert_eq!(trade.kind == TradeKind::Buy, k % 2 == 0);
        }
    }
}

// ── 3. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn generation_is_idempotent((bars, iv) in arb_case(), m in arb_multiple()) {
        let params = StrategyParams { atr_multiple: m };
        let a = generate(&bars, &iv, &params).unwrap();
        let b = generate(&bars, &iv, &params).unwrap();
        prop_assert_eq!(a, b);
    }
}

// ── 4. Stops ─────────────────────────────────────────────────────────

proptest! {
    /// The stop never moves while long, and a stop exit closes below it.
    #[test]
    fn stop_is_fixed_at_entry((bars, iv) in arb_case(), m in arb_multiple()) {
        let out = generate(&bars, &iv, &StrategyParams { atr_multiple: m }).unwrap();
        let atr = iv.get_series(ATR).unwrap();
        for i in 1..bars.len() {
            if let PositionState::Long { entry_index, entry_price, stop_level } = out.states[i] {
                prop_assert_eq!(entry_price, bars[entry_index].close);
                prop_assert!((stop_level - (entry_price - m * atr[entry_index])).abs() < 1e-9);
            }
            if out.intents[i] == Intent::ExitByStop {
                let stop = out.states[i - 1].stop_level().unwrap();
                prop_assert!(bars[i].close < stop);
            }
            if out.intents[i] == Intent::Hold {
                let stop = out.states[i - 1].stop_level().unwrap();
                prop_assert!(bars[i].close >= stop);
            }
        }
    }
}

// ── 5. Engine ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn applied_exposure_lags_decisions((bars, iv) in arb_case()) {
        let out = generate(&bars, &iv, &StrategyParams::default()).unwrap();
        let result = run(&bars, &out.intents, &EngineConfig::default()).unwrap();
        prop_assert_eq!(&result.applied_positions, &lagged(&result.positions));
        prop_assert_eq!(result.applied_positions[0], 0.0);
        prop_assert!(result.strategy_returns[0].is_nan());
    }

    /// Applying exposure on the bar it was decided gives different returns
    /// on every position change with a non-zero market move.
    #[test]
    fn unlagged_returns_differ_on_position_changes((bars, iv) in arb_case()) {
        let out = generate(&bars, &iv, &StrategyParams::default()).unwrap();
        let result = run(&bars, &out.intents, &EngineConfig::default()).unwrap();
        for i in 1..bars.len() {
            let market = result.market_returns[i];
            let unlagged = result.positions[i] * market;
            if result.positions[i] != result.positions[i - 1] && market != 0.0 {
                prop_assert!(unlagged != result.strategy_returns[i], "bar {}", i);
            } else {
                prop_assert_eq!(unlagged, result.strategy_returns[i]);
            }
        }
    }

    #[test]
    fn drawdown_is_never_positive((bars, iv) in arb_case()) {
        let out = generate(&bars, &iv, &StrategyParams::default()).unwrap();
        let result = run(&bars, &out.intents, &EngineConfig::default()).unwrap();
        let summary = evaluate(&result.equity_curve, &result.strategy_returns, &EvaluationConfig::default()).unwrap();
        prop_assert!(summary.max_drawdown <= 0.0);
        prop_assert!(summary.max_drawdown >= -1.0);
    }

    /// Zero drawdown exactly when the equity curve never falls.
    #[test]
    fn zero_drawdown_iff_non_decreasing(steps in prop::collection::vec(-2.0..2.0_f64, 1..60)) {
        let mut equity = Vec::with_capacity(steps.len());
        let mut level = 100.0;
        for s in steps {
            level = (level + s.round()).max(1.0);
            equity.push(level);
        }
        let non_decreasing = equity.windows(2).all(|w| w[1] >= w[0]);
        prop_assert_eq!(max_drawdown(&equity) == 0.0, non_decreasing);
    }

    #[test]
    fn never_long_keeps_initial_cash(closes in prop::collection::vec(10.0..500.0_f64, 2..60)) {
        let bars = bars_from(&closes);
        let intents = vec![Intent::Flat; bars.len()];
        let config = EngineConfig { initial_cash: 250.0, commission_rate: 0.0 };
        let result = run(&bars, &intents, &config).unwrap();
        prop_assert!(result.equity_curve.strategy_equity().iter().all(|e| *e == 250.0));
        let summary = evaluate(&result.equity_curve, &result.strategy_returns, &EvaluationConfig::default()).unwrap();
        prop_assert!(summary.win_rate.is_nan());
        prop_assert_eq!(summary.max_drawdown, 0.0);
    }
}
