//! Momolab CLI: replay bar files through the momentum trader.
//!
//! Commands:
//! - `replay`: stream CSV bar files through one trader per symbol, print events as JSON lines
//! - `signals`: per-bar indicator, pattern and signal table for one bar file
//! - `config`: print the effective configuration as TOML

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use momolab_core::config::MomentumConfig;
use momolab_core::data::{load_bars_csv, symbol_from_path, ChannelSink, ReplaySource};
use momolab_core::engine::{run_portfolio, RunControl, RunOptions, RunSummary};
use momolab_core::risk::parse_risk_input;
use momolab_core::signals::MomentumSignals;

#[derive(Parser)]
#[command(
    name = "momolab",
    about = "Momolab CLI: intraday momentum entries, trailing stops and risk sizing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay CSV bar files (timestamp,open,high,low,close,volume); symbol is the file stem.
    Replay {
        /// Bar files, one per symbol.
        #[arg(long, required = true, num_args = 1..)]
        bars: Vec<PathBuf>,

        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Per-trade risk override, e.g. "0.5%", "2" (percent) or "0.005" (fraction).
        #[arg(long)]
        risk: Option<String>,

        /// Pause between bars, in milliseconds.
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Print the per-bar signal table for one bar file.
    Signals {
        /// Bar file.
        #[arg(long)]
        bars: PathBuf,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML.
    Config {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            bars,
            config,
            risk,
            delay_ms,
        } => run_replay(bars, config.as_deref(), risk.as_deref(), delay_ms).await,
        Commands::Signals { bars, config } => run_signals(&bars, config.as_deref()),
        Commands::Config { config } => run_config(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<MomentumConfig> {
    match path {
        Some(path) => MomentumConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(MomentumConfig::default()),
    }
}

fn load_symbol(path: &Path) -> Result<(String, Vec<momolab_core::Bar>)> {
    let symbol = symbol_from_path(path)
        .with_context(|| format!("cannot derive a symbol from {}", path.display()))?;
    let bars =
        load_bars_csv(path, &symbol).with_context(|| format!("loading bars {}", path.display()))?;
    Ok((symbol, bars))
}

async fn run_replay(
    files: Vec<PathBuf>,
    config_path: Option<&Path>,
    risk_text: Option<&str>,
    delay_ms: u64,
) -> Result<()> {
    let config = load_config(config_path)?;
    let risk_override = match risk_text {
        Some(text) => match parse_risk_input(text) {
            Some(fraction) => Some(fraction),
            None => bail!("unusable --risk value {text:?}; try \"1%\", \"1\" or \"0.01\""),
        },
        None => None,
    };

    let mut source = ReplaySource::new().with_delay(Duration::from_millis(delay_ms));
    let mut symbols = Vec::with_capacity(files.len());
    for path in &files {
        let (symbol, bars) = load_symbol(path)?;
        if symbols.contains(&symbol) {
            bail!("symbol {symbol} given twice");
        }
        info!(%symbol, bars = bars.len(), "loaded bar file");
        source.insert(symbol.clone(), bars);
        symbols.push(symbol);
    }

    let control = Arc::new(RunControl::new(config.risk_params()));
    let (sink, mut events) = ChannelSink::channel(256);

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!(error = %err, "failed to serialize event"),
            }
        }
    });

    let ctrl_c = {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                control.request_shutdown();
            }
        })
    };

    let options = RunOptions {
        risk_override,
        close_on_end: true,
    };
    let results = run_portfolio(
        &symbols,
        Arc::new(source),
        sink,
        Arc::new(config),
        options,
        control.risk_receiver(),
        control.shutdown_receiver(),
    )
    .await;

    ctrl_c.abort();
    printer.await.context("event printer task failed")?;

    let mut failures = 0;
    for (symbol, result) in &results {
        match result {
            Ok(summary) => print_summary(summary),
            Err(err) => {
                failures += 1;
                eprintln!("{symbol}: {err}");
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} symbols failed", results.len());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let last_exit = summary.last_exit.map_or("-", |reason| reason.as_str());
    eprintln!(
        "{:<8} bars {:>6} (rejected {:>3}) | entries {:>3} exits {:>3} stop raises {:>4} \
         | pnl {:>10.2} | last exit {:<11} | {}",
        summary.symbol,
        summary.bars_processed,
        summary.bars_rejected,
        summary.entries,
        summary.exits,
        summary.stops_raised,
        summary.realized_pnl,
        last_exit,
        summary.final_state,
    );
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

fn run_signals(path: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let (symbol, bars) = load_symbol(path)?;
    let signals = MomentumSignals::new(config.signal_config(), config.indicator_params());

    println!("{symbol}: {} bars", bars.len());
    println!(
        "{:>5}  {:<20}  {:>10}  {:>10}  {:>9}  {:>9}  {:>9}  {:>9}  {:<5}  {:<5}  patterns",
        "idx", "timestamp", "close", "ema", "macd", "signal", "hist", "cci", "entry", "exit"
    );
    for row in signals.scan(&bars) {
        let (entry, exit) = if row.signals.warming_up {
            ("~", "~")
        } else {
            (
                if row.signals.entry { "ENTRY" } else { "" },
                if row.signals.exit_flip { "FLIP" } else { "" },
            )
        };
        println!(
            "{:>5}  {:<20}  {:>10.3}  {:>10}  {:>9}  {:>9}  {:>9}  {:>9}  {:<5}  {:<5}  {}",
            row.bar_index,
            row.timestamp.format("%Y-%m-%d %H:%M:%S"),
            row.close,
            fmt_opt(row.indicators.ema),
            fmt_opt(row.indicators.macd_line),
            fmt_opt(row.indicators.macd_signal),
            fmt_opt(row.indicators.macd_hist),
            fmt_opt(row.indicators.cci),
            entry,
            exit,
            row.patterns,
        );
    }
    Ok(())
}

fn run_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    print!("{}", config.to_toml()?);
    Ok(())
}
