//! Artifact export: JSON and CSV.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape, round trips, equity curve and sweep tables
//!
//! All persisted JSON carries a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use goldx_core::domain::{RoundTrip, TradeRecord};
use goldx_core::engine::EquityCurve;

use crate::fitness::FitnessMetric;
use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON. Undefined metrics become `null`.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_default()
}

/// Columns: bar_index, timestamp, kind, price, stop_level
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "kind", "price", "stop_level"])?;
    for t in trades {
        wtr.write_record([
            &t.bar_index.to_string(),
            &t.timestamp.to_string(),
            &t.kind.as_str().to_string(),
            &format!("{:.6}", t.price),
            &fmt_opt(t.stop_level),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: entry_bar, entry_price, exit_bar, exit_price, exit_kind, return_pct, bars_held
pub fn export_round_trips_csv(trips: &[RoundTrip]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_bar",
        "entry_price",
        "exit_bar",
        "exit_price",
        "exit_kind",
        "return_pct",
        "bars_held",
    ])?;
    for rt in trips {
        wtr.write_record([
            &rt.entry_bar.to_string(),
            &format!("{:.6}", rt.entry_price),
            &rt.exit_bar.to_string(),
            &format!("{:.6}", rt.exit_price),
            &rt.exit_kind.as_str().to_string(),
            &format!("{:.6}", rt.return_pct()),
            &rt.bars_held().to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: bar_index, timestamp, strategy_equity, market_equity, exposure
pub fn export_equity_csv(curve: &EquityCurve) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "bar_index",
        "timestamp",
        "strategy_equity",
        "market_equity",
        "exposure",
    ])?;
    for (i, p) in curve.points().iter().enumerate() {
        wtr.write_record([
            &i.to_string(),
            &p.timestamp.to_string(),
            &format!("{:.8}", p.strategy_equity),
            &format!("{:.8}", p.market_equity),
            &format!("{}", p.exposure),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per sweep run, in the order given. Undefined metrics are empty cells.
pub fn export_sweep_csv(results: &[&BacktestResult], metric: FitnessMetric) -> Result<String> {
    let defined = |v: f64| if v.is_nan() { None } else { Some(v) };

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "run_id",
        "macd_fast",
        "macd_slow",
        "macd_signal",
        "atr_period",
        "atr_multiple",
        "entries",
        "win_rate",
        "annualized_return",
        "sharpe_ratio",
        "max_drawdown",
        "final_equity",
        metric.as_str(),
    ])?;
    for (rank, r) in results.iter().enumerate() {
        let ind = &r.config.indicators;
        let s = &r.summary;
        wtr.write_record([
            &(rank + 1).to_string(),
            &r.run_id,
            &ind.macd_fast.to_string(),
            &ind.macd_slow.to_string(),
            &ind.macd_signal.to_string(),
            &ind.atr_period.to_string(),
            &r.config.strategy.atr_multiple.to_string(),
            &r.entry_count().to_string(),
            &fmt_opt(defined(s.win_rate)),
            &fmt_opt(defined(s.annualized_return)),
            &fmt_opt(defined(s.sharpe_ratio)),
            &fmt_opt(defined(s.max_drawdown)),
            &fmt_opt(Some(r.final_strategy_equity())),
            &fmt_opt(defined(metric.extract(r))),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates `{run_id[..12]}_{timestamp}/` under `output_dir` containing:
/// - `result.json`: the full `BacktestResult`
/// - `trades.csv`: trade tape
/// - `round_trips.csv`: completed entry/exit pairs
/// - `equity.csv`: bar-by-bar strategy and market equity
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id = &result.run_id[..result.run_id.len().min(12)];
    let dirname = format!(
        "{}_{}",
        short_id,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("result.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;
    std::fs::write(
        run_dir.join("round_trips.csv"),
        export_round_trips_csv(&result.round_trips())?,
    )?;
    std::fs::write(
        run_dir.join("equity.csv"),
        export_equity_csv(&result.equity_curve)?,
    )?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's result.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
