//! CSV bar files and trade-log export.
//!
//! History files live in one directory and are named `{SYMBOL}_{minutes}m.csv`
//! with columns `time,open,high,low,close,volume`. `time` is epoch seconds,
//! epoch milliseconds, or RFC 3339.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;
use crate::domain::position::Trade;
use crate::ports::history_port::HistoryPort;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Epoch values above this are taken to be milliseconds.
const EPOCH_MS_THRESHOLD: i64 = 100_000_000_000;

#[derive(Debug, Deserialize)]
struct BarRecord {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

pub struct CsvHistoryAdapter {
    base_path: PathBuf,
}

impl CsvHistoryAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, symbol: &str, timeframe_minutes: u32) -> PathBuf {
        self.base_path
            .join(format!("{symbol}_{timeframe_minutes}m.csv"))
    }

    /// Every bar in the file, sorted by time. A missing file yields no bars.
    pub fn read_all(&self, symbol: &str, timeframe_minutes: u32) -> Result<Vec<Bar>, EngineError> {
        let path = self.csv_path(symbol, timeframe_minutes);
        match fs::read_to_string(&path) {
            Ok(content) => parse_bars(&content).map_err(|reason| EngineError::History {
                reason: format!("{}: {reason}", path.display()),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no history file");
                Ok(Vec::new())
            }
            Err(e) => Err(EngineError::History {
                reason: format!("failed to read {}: {e}", path.display()),
            }),
        }
    }
}

impl HistoryPort for CsvHistoryAdapter {
    fn load_history(
        &self,
        symbol: &str,
        timeframe_minutes: u32,
        count: usize,
    ) -> Result<Vec<Bar>, EngineError> {
        let mut bars = self.read_all(symbol, timeframe_minutes)?;
        let start = bars.len().saturating_sub(count);
        Ok(bars.split_off(start))
    }
}

/// Parses epoch seconds, epoch milliseconds or an RFC 3339 timestamp.
pub fn parse_time(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    if let Ok(epoch) = raw.parse::<i64>() {
        return Ok(if epoch.abs() >= EPOCH_MS_THRESHOLD {
            epoch / 1000
        } else {
            epoch
        });
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp())
        .map_err(|e| format!("invalid time '{raw}': {e}"))
}

/// Epoch seconds as `YYYY-MM-DDTHH:MM:SSZ`, or the raw number when out of range.
pub fn format_time(time: i64) -> String {
    DateTime::from_timestamp(time, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| time.to_string())
}

fn parse_bars(content: &str) -> Result<Vec<Bar>, String> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for (line, result) in rdr.deserialize::<BarRecord>().enumerate() {
        let record = result.map_err(|e| format!("CSV parse error: {e}"))?;
        let time = parse_time(&record.time).map_err(|e| format!("row {}: {e}", line + 1))?;
        bars.push(Bar::new(
            time,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        ));
    }

    bars.sort_by_key(|b| b.time);
    bars.dedup_by_key(|b| b.time);
    Ok(bars)
}

#[derive(Debug, Serialize)]
struct TradeRecord<'a> {
    side: String,
    entry_time: String,
    exit_time: String,
    entry_price: f64,
    exit_price: f64,
    quantity: f64,
    pnl: f64,
    fee: f64,
    net_pnl: f64,
    reason: &'a str,
}

/// Writes the trade log, oldest first, as CSV.
pub fn write_trade_log(path: &Path, trades: &[Trade]) -> Result<(), EngineError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_to_io)?;
    for trade in trades {
        let reason = trade.reason.to_string();
        writer
            .serialize(TradeRecord {
                side: trade.side.to_string(),
                entry_time: format_time(trade.entry_time),
                exit_time: format_time(trade.exit_time),
                entry_price: trade.entry_price,
                exit_price: trade.exit_price,
                quantity: trade.quantity,
                pnl: trade.pnl,
                fee: trade.fee,
                net_pnl: trade.net_pnl(),
                reason: &reason,
            })
            .map_err(csv_to_io)?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_to_io(err: csv::Error) -> EngineError {
    EngineError::Io(io::Error::other(err))
}
