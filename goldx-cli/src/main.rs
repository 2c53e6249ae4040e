//! GoldX CLI: single backtests and parameter sweeps.
//!
//! Commands:
//! - `run`: backtest the MACD golden-cross strategy on one bar series
//! - `sweep`: run a parameter grid and print the best configurations

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};

use goldx_runner::export::{export_sweep_csv, save_artifacts};
use goldx_runner::{
    load_csv, run_loaded, synthetic_bars, BacktestResult, FitnessMetric, GoldxConfig, LoadedBars,
    ParamSweep,
};

#[derive(Parser)]
#[command(
    name = "goldx",
    version,
    about = "GoldX: MACD golden-cross backtester with an ATR stop"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the bars come from.
#[derive(Args)]
struct DataArgs {
    /// CSV with Date/Datetime, Open, High, Low, Close and optional Volume columns.
    #[arg(long, required_unless_present = "synthetic", conflicts_with = "synthetic")]
    data: Option<PathBuf>,

    /// Generate this many synthetic bars instead of reading a file.
    #[arg(long, value_name = "BARS")]
    synthetic: Option<usize>,

    /// Seed for --synthetic.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Path to a TOML config file. Defaults apply to anything not set.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one parameter set, print trades and summary, save artifacts.
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// Stop distance below entry, in ATRs (overrides the config file).
        #[arg(long)]
        atr_multiple: Option<f64>,

        /// Fraction of equity charged per unit change in exposure.
        #[arg(long)]
        commission: Option<f64>,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Run the config's [sweep] grid (or the default grid) and rank the results.
    Sweep {
        #[command(flatten)]
        data: DataArgs,

        /// Ranking metric: sharpe, annualized-return, win-rate, max-drawdown, final-equity.
        #[arg(long, default_value = "sharpe")]
        metric: FitnessMetric,

        /// Number of results to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Run configurations one after another instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Write the full ranking as sweep.csv into this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            data,
            atr_multiple,
            commission,
            output_dir,
            no_save,
        } => run_cmd(data, atr_multiple, commission, output_dir, no_save),
        Commands::Sweep {
            data,
            metric,
            top,
            sequential,
            output_dir,
        } => sweep_cmd(data, metric, top, sequential, output_dir),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn load_inputs(args: &DataArgs) -> Result<(LoadedBars, GoldxConfig)> {
    let config = match &args.config {
        Some(path) => GoldxConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GoldxConfig::default(),
    };

    let loaded = match (&args.data, args.synthetic) {
        (Some(path), _) => {
            load_csv(path).with_context(|| format!("loading bars from {}", path.display()))?
        }
        (None, Some(n)) => {
            info!("generating {n} synthetic bars (seed {})", args.seed);
            synthetic_bars(n, args.seed)
        }
        (None, None) => bail!("one of --data or --synthetic is required"),
    };
    debug!(
        "dataset {} ({} bars, {} rows dropped)",
        loaded.dataset_hash.short(),
        loaded.bars.len(),
        loaded.dropped_rows
    );
    Ok((loaded, config))
}

fn run_cmd(
    data: DataArgs,
    atr_multiple: Option<f64>,
    commission: Option<f64>,
    output_dir: PathBuf,
    no_save: bool,
) -> Result<()> {
    let (loaded, mut config) = load_inputs(&data)?;
    if let Some(m) = atr_multiple {
        config.strategy.atr_multiple = m;
    }
    if let Some(c) = commission {
        config.engine.commission_rate = c;
    }

    let result = run_loaded(&loaded, &config)?;

    print_trades(&result);
    print_summary(&result);

    if !no_save {
        let run_dir = save_artifacts(&result, &output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn sweep_cmd(
    data: DataArgs,
    metric: FitnessMetric,
    top: usize,
    sequential: bool,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let (loaded, config) = load_inputs(&data)?;
    let grid = config.sweep.clone().unwrap_or_default();

    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .sweep(&loaded, &grid, &config)?;
    let ranked = results.ranked(metric);

    println!();
    println!("=== Sweep: top {} of {} by {metric} ===", top.min(ranked.len()), ranked.len());
    println!(
        "{:>4}  {:>4} {:>4} {:>4}  {:>4} {:>5}  {:>7}  {:>8}  {:>8}  {:>8}  {:>10}",
        "rank", "fast", "slow", "sig", "atr", "mult", "entries", "win%", "sharpe", "maxdd%", "final eq"
    );
    for (rank, r) in ranked.iter().take(top).enumerate() {
        let ind = &r.config.indicators;
        println!(
            "{:>4}  {:>4} {:>4} {:>4}  {:>4} {:>5.2}  {:>7}  {:>8}  {:>8}  {:>8}  {:>10.4}",
            rank + 1,
            ind.macd_fast,
            ind.macd_slow,
            ind.macd_signal,
            ind.atr_period,
            r.config.strategy.atr_multiple,
            r.entry_count(),
            fmt_pct(r.summary.win_rate),
            fmt_num(r.summary.sharpe_ratio),
            fmt_pct(r.summary.max_drawdown),
            r.final_strategy_equity(),
        );
    }

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join("sweep.csv");
        std::fs::write(&path, export_sweep_csv(&ranked, metric)?)?;
        println!("Ranking saved to: {}", path.display());
    }
    Ok(())
}

fn fmt_pct(v: f64) -> String {
    if v.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.2}", v * 100.0)
    }
}

fn fmt_num(v: f64) -> String {
    if v.is_nan() {
        "n/a".to_string()
    } else {
        format!("{v:.3}")
    }
}

fn print_trades(result: &BacktestResult) {
    println!();
    println!("=== Trades ===");
    if result.trades.is_empty() {
        println!("(none)");
    }
    for t in &result.trades {
        match t.stop_level {
            Some(stop) => println!(
                "{}  {:<4}  {:>12.4}  stop {:.4}",
                t.timestamp,
                t.kind.as_str(),
                t.price,
                stop
            ),
            None => println!("{}  {:<4}  {:>12.4}", t.timestamp, t.kind.as_str(), t.price),
        }
    }
}

fn print_summary(result: &BacktestResult) {
    let s = &result.summary;
    println!();
    println!("=== Backtest Result ===");
    println!("Period:         {} to {}", result.start, result.end);
    println!(
        "Bars:           {} ({} warmup, {} in market)",
        result.bar_count, result.warmup_bars, result.bars_in_market
    );
    println!("Entries:        {}", result.entry_count());
    println!("Round trips:    {}", result.round_trips().len());
    println!();
    println!("--- Performance ---");
    println!("Win Rate:       {}%", fmt_pct(s.win_rate));
    println!("Annual Return:  {}%", fmt_pct(s.annualized_return));
    println!("Sharpe:         {}", fmt_num(s.sharpe_ratio));
    println!("Max Drawdown:   {}%", fmt_pct(s.max_drawdown));
    println!("Final Equity:   {:.4}", result.final_strategy_equity());
    println!("Buy & Hold:     {:.4}", result.final_market_equity());
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
