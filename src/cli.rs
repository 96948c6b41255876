//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::clock::ManualClock;
use crate::adapters::console_render::{ConsoleRenderer, MAX_REASONS};
use crate::adapters::csv_adapter::{CsvHistoryAdapter, write_trade_log};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::jsonl_render::JsonLinesRenderer;
use crate::adapters::memory_history::MemoryHistory;
use crate::domain::config::{EngineConfig, build_engine_config};
use crate::domain::engine::Engine;
use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;
use crate::ports::render_port::RenderPort;

#[derive(Parser, Debug)]
#[command(name = "zonetrader", about = "Zone-based signal engine with a paper broker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a CSV bar file through the engine
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding `{SYMBOL}_{minutes}m.csv` files
        #[arg(short, long)]
        data: PathBuf,
        /// Bars used as bootstrap history (default: window_size)
        #[arg(long)]
        warmup: Option<usize>,
        /// Emit every engine event as JSON lines on stdout
        #[arg(long)]
        json: bool,
        /// Write the paper trade log to this CSV file
        #[arg(long)]
        trades: Option<PathBuf>,
    },
    /// Validate an engine configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Run {
            config,
            data,
            warmup,
            json,
            trades,
        } => run_replay(&config, &data, warmup, json, trades.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<EngineConfig, EngineError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    build_engine_config(&adapter)
}

/// Splits a bar file into bootstrap history and the replayed feed. Higher
/// timeframe bars are cut at the last history bar so the replay never sees
/// the future.
pub fn split_history(
    main: Vec<Bar>,
    higher: Vec<Bar>,
    warmup: usize,
    config: &EngineConfig,
) -> (MemoryHistory, Vec<Bar>) {
    let mut main = main;
    let feed = main.split_off(warmup.min(main.len()));
    let cutoff = main.last().map(|b| b.time).unwrap_or(i64::MIN);
    let higher: Vec<Bar> = higher.into_iter().filter(|b| b.time <= cutoff).collect();

    let mut history = MemoryHistory::new();
    if config.higher_timeframe_minutes != config.main_timeframe_minutes {
        history.insert(config.higher_timeframe_minutes, higher);
    }
    history.insert(config.main_timeframe_minutes, main);
    (history, feed)
}

fn run_replay(
    config_path: &Path,
    data_dir: &Path,
    warmup: Option<usize>,
    json: bool,
    trades_path: Option<&Path>,
) -> Result<(), EngineError> {
    let config = load_config(config_path)?;

    let csv = CsvHistoryAdapter::new(data_dir.to_path_buf());
    let main = csv.read_all(&config.symbol, config.main_timeframe_minutes)?;
    if main.is_empty() {
        return Err(EngineError::History {
            reason: format!(
                "no bars in {}",
                csv.csv_path(&config.symbol, config.main_timeframe_minutes)
                    .display()
            ),
        });
    }
    let higher = csv.read_all(&config.symbol, config.higher_timeframe_minutes)?;
    let warmup = warmup.unwrap_or(config.window_size);
    let (history, feed) = split_history(main, higher, warmup, &config);

    eprintln!(
        "Replaying {} {}m: {} feed bars after warmup",
        config.symbol,
        config.main_timeframe_minutes,
        feed.len()
    );

    // Throttles follow feed time so replays are reproducible.
    let clock = ManualClock::new(0);
    let mut engine = Engine::new(config, Box::new(clock.clone()))?;
    let mut renderer: Box<dyn RenderPort> = if json {
        Box::new(JsonLinesRenderer::new(io::stdout()))
    } else {
        Box::new(ConsoleRenderer::new(io::stdout()))
    };

    let seeded = engine.bootstrap(&history)?;
    renderer.emit_all(&seeded)?;

    let mut rejected = 0usize;
    for bar in feed {
        clock.set(u64::try_from(bar.time).unwrap_or(0).saturating_mul(1000));
        match engine.on_bar(bar, true) {
            Ok(events) => renderer.emit_all(&events)?,
            Err(e) if e.is_feed_rejection() => rejected += 1,
            Err(e) => return Err(e),
        }
    }

    print_summary(&engine, rejected);

    if let Some(path) = trades_path {
        write_trade_log(path, engine.broker().trades())?;
        info!(path = %path.display(), trades = engine.broker().trades().len(), "trade log written");
        eprintln!("\nTrade log written to: {}", path.display());
    }
    Ok(())
}

fn print_summary(engine: &Engine, rejected: usize) {
    let decision = engine.decision();
    let stats = engine.stats();
    let broker = engine.broker();

    eprintln!("\n=== Signal ===");
    eprintln!("Signal:           {}", decision.signal);
    eprintln!("Summary:          {}", decision.summary);
    for reason in decision.reasons.iter().take(MAX_REASONS) {
        eprintln!("  - {reason}");
    }
    if let Some(plan) = engine.plan() {
        eprintln!(
            "Plan:             entry {:.2} / stop {:.2} / target {:.2}",
            plan.entry, plan.stop_loss, plan.take_profit
        );
    }
    eprintln!("Transitions:      {}", engine.transitions());
    if rejected > 0 {
        eprintln!("Rejected bars:    {rejected}");
    }

    eprintln!("\n=== Paper Broker ===");
    eprintln!("Balance:          {:.2}", broker.account().balance);
    eprintln!("Equity:           {:.2}", broker.equity());
    if let Some(pos) = broker.position() {
        eprintln!(
            "Open position:    {} {:.6} @ {:.2} (stop {:.2}, target {:.2})",
            pos.side, pos.quantity, pos.entry_price, pos.stop_loss, pos.take_profit
        );
    }
    eprintln!("Total Trades:     {}", stats.total_trades);
    eprintln!("Win Rate:         {:.1}%", stats.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", stats.profit_factor);
    eprintln!("Realized P&L:     {:+.2}", stats.realized_pnl);
    eprintln!("Total Return:     {:.2}%", stats.total_return * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", stats.max_drawdown * 100.0);
}

fn run_validate(config_path: &Path) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    eprintln!("Config validated successfully");
    eprintln!("  symbol:           {}", config.symbol);
    eprintln!(
        "  timeframes:       {}m (higher {}m, signal {}m)",
        config.main_timeframe_minutes,
        config.higher_timeframe_minutes,
        config.signal_timeframe_minutes
    );
    eprintln!(
        "  ema:              {} / {}",
        config.ema_fast_period, config.ema_slow_period
    );
    eprintln!("  decision mode:    {}", config.decision_mode);
    eprintln!(
        "  paper:            capital {:.2}, leverage {}x, fee {}",
        config.paper_capital, config.paper_leverage, config.paper_fee_rate
    );
    Ok(())
}
