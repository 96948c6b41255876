//! Engine configuration.
//!
//! One validated struct handed to [`crate::domain::engine::Engine::new`]; the
//! engine never reads configuration from anywhere else.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::config_validation::validate_engine_config;
use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;

/// How the decision pipeline turns pattern state into a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    /// Ordered gates with confirmation; the default.
    #[default]
    FilterChain,
    /// Point scoring kept for compatibility.
    Additive,
}

impl FromStr for DecisionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "filter_chain" | "filter-chain" | "filter" => Ok(DecisionMode::FilterChain),
            "additive" | "score" | "scoring" => Ok(DecisionMode::Additive),
            other => Err(format!(
                "unknown decision mode '{other}', expected filter_chain or additive"
            )),
        }
    }
}

impl fmt::Display for DecisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionMode::FilterChain => write!(f, "filter_chain"),
            DecisionMode::Additive => write!(f, "additive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    pub symbol: String,
    pub main_timeframe_minutes: u32,
    pub higher_timeframe_minutes: u32,
    /// Filter-chain signals are only produced when the main timeframe equals this.
    pub signal_timeframe_minutes: u32,
    /// Bar Buffer capacity for the main timeframe.
    pub window_size: usize,
    /// Bars requested for the higher-timeframe bootstrap.
    pub htf_window_size: usize,

    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    pub atr_period: usize,
    pub atr_low_ratio: f64,
    pub atr_high_ratio: f64,

    pub decision_mode: DecisionMode,
    pub zone_count: usize,
    pub fvg_scan_depth: usize,
    pub ob_scan_depth: usize,
    pub sweep_lookback: usize,
    pub reward_multiple: f64,
    pub sl_buffer_fraction: f64,

    pub paper_capital: f64,
    pub paper_leverage: f64,
    /// Round-trip fee rate, charged in full at entry.
    pub paper_fee_rate: f64,
    /// Whether the paper broker follows signal transitions.
    pub auto_trade: bool,

    /// Light throttle for cosmetic readouts; 0 refreshes on every event.
    pub readout_throttle_ms: u64,
    /// Heavy throttle for zone redetection; 0 rescans on every closed bar.
    pub redetect_throttle_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            symbol: "BTCUSDT".to_string(),
            main_timeframe_minutes: 15,
            higher_timeframe_minutes: 60,
            signal_timeframe_minutes: 15,
            window_size: 500,
            htf_window_size: 300,
            ema_fast_period: 50,
            ema_slow_period: 200,
            atr_period: 14,
            atr_low_ratio: 0.0015,
            atr_high_ratio: 0.01,
            decision_mode: DecisionMode::FilterChain,
            zone_count: 3,
            fvg_scan_depth: 120,
            ob_scan_depth: 180,
            sweep_lookback: 25,
            reward_multiple: 2.0,
            sl_buffer_fraction: 0.001,
            paper_capital: 10_000.0,
            paper_leverage: 1.0,
            paper_fee_rate: 0.0008,
            auto_trade: true,
            readout_throttle_ms: 250,
            redetect_throttle_ms: 0,
        }
    }
}

fn get_count(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, EngineError> {
    let value = adapter.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| EngineError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("{key} must be non-negative"),
    })
}

fn get_minutes(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: u32,
) -> Result<u32, EngineError> {
    let value = adapter.get_int(section, key, i64::from(default));
    u32::try_from(value).map_err(|_| EngineError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("{key} must be a positive number of minutes"),
    })
}

/// Reads `[engine]`, `[indicators]`, `[signal]` and `[paper]`, falling back to
/// defaults for absent keys, then validates the result.
pub fn build_engine_config(adapter: &dyn ConfigPort) -> Result<EngineConfig, EngineError> {
    let d = EngineConfig::default();

    let decision_mode = match adapter.get_string("signal", "decision_mode") {
        Some(raw) => raw
            .parse::<DecisionMode>()
            .map_err(|reason| EngineError::ConfigInvalid {
                section: "signal".into(),
                key: "decision_mode".into(),
                reason,
            })?,
        None => d.decision_mode,
    };

    let config = EngineConfig {
        symbol: adapter
            .get_string("engine", "symbol")
            .map(|s| s.trim().to_uppercase())
            .unwrap_or(d.symbol),
        main_timeframe_minutes: get_minutes(
            adapter,
            "engine",
            "main_timeframe_minutes",
            d.main_timeframe_minutes,
        )?,
        higher_timeframe_minutes: get_minutes(
            adapter,
            "engine",
            "higher_timeframe_minutes",
            d.higher_timeframe_minutes,
        )?,
        signal_timeframe_minutes: get_minutes(
            adapter,
            "engine",
            "signal_timeframe_minutes",
            d.signal_timeframe_minutes,
        )?,
        window_size: get_count(adapter, "engine", "window_size", d.window_size)?,
        htf_window_size: get_count(adapter, "engine", "htf_window_size", d.htf_window_size)?,
        ema_fast_period: get_count(adapter, "indicators", "ema_fast_period", d.ema_fast_period)?,
        ema_slow_period: get_count(adapter, "indicators", "ema_slow_period", d.ema_slow_period)?,
        atr_period: get_count(adapter, "indicators", "atr_period", d.atr_period)?,
        atr_low_ratio: adapter.get_double("indicators", "atr_low_ratio", d.atr_low_ratio),
        atr_high_ratio: adapter.get_double("indicators", "atr_high_ratio", d.atr_high_ratio),
        decision_mode,
        zone_count: get_count(adapter, "signal", "zone_count", d.zone_count)?,
        fvg_scan_depth: get_count(adapter, "signal", "fvg_scan_depth", d.fvg_scan_depth)?,
        ob_scan_depth: get_count(adapter, "signal", "ob_scan_depth", d.ob_scan_depth)?,
        sweep_lookback: get_count(adapter, "signal", "sweep_lookback", d.sweep_lookback)?,
        reward_multiple: adapter.get_double("signal", "reward_multiple", d.reward_multiple),
        sl_buffer_fraction: adapter.get_double(
            "signal",
            "sl_buffer_fraction",
            d.sl_buffer_fraction,
        ),
        paper_capital: adapter.get_double("paper", "capital", d.paper_capital),
        paper_leverage: adapter.get_double("paper", "leverage", d.paper_leverage),
        paper_fee_rate: adapter.get_double("paper", "fee_rate", d.paper_fee_rate),
        auto_trade: adapter.get_bool("paper", "auto_trade", d.auto_trade),
        readout_throttle_ms: get_count(
            adapter,
            "engine",
            "readout_throttle_ms",
            d.readout_throttle_ms as usize,
        )? as u64,
        redetect_throttle_ms: get_count(
            adapter,
            "engine",
            "redetect_throttle_ms",
            d.redetect_throttle_ms as usize,
        )? as u64,
    };

    validate_engine_config(&config)?;
    Ok(config)
}
