#![allow(dead_code)]

use std::collections::HashMap;

use zonetrader::adapters::clock::ManualClock;
use zonetrader::domain::config::EngineConfig;
use zonetrader::domain::engine::Engine;
use zonetrader::domain::error::EngineError;
pub use zonetrader::domain::ohlcv::Bar;
use zonetrader::ports::history_port::HistoryPort;

pub struct MockHistoryPort {
    pub data: HashMap<u32, Vec<Bar>>,
    pub errors: HashMap<u32, String>,
}

impl MockHistoryPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, timeframe_minutes: u32, bars: Vec<Bar>) -> Self {
        self.data.insert(timeframe_minutes, bars);
        self
    }

    pub fn with_error(mut self, timeframe_minutes: u32, reason: &str) -> Self {
        self.errors.insert(timeframe_minutes, reason.to_string());
        self
    }
}

impl HistoryPort for MockHistoryPort {
    fn load_history(
        &self,
        _symbol: &str,
        timeframe_minutes: u32,
        count: usize,
    ) -> Result<Vec<Bar>, EngineError> {
        if let Some(reason) = self.errors.get(&timeframe_minutes) {
            return Err(EngineError::History {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(&timeframe_minutes).cloned().unwrap_or_default();
        let start = bars.len().saturating_sub(count);
        Ok(bars[start..].to_vec())
    }
}

pub fn make_bar(time: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar::new(time, open, high, low, close, 1_000.0)
}

/// One-minute engine with short periods; the higher timeframe equals the main one.
pub fn scenario_config() -> EngineConfig {
    EngineConfig {
        symbol: "TEST".into(),
        main_timeframe_minutes: 1,
        higher_timeframe_minutes: 1,
        signal_timeframe_minutes: 1,
        window_size: 100,
        htf_window_size: 100,
        ema_fast_period: 3,
        ema_slow_period: 8,
        atr_period: 3,
        atr_low_ratio: 0.001,
        atr_high_ratio: 0.5,
        zone_count: 3,
        fvg_scan_depth: 20,
        ob_scan_depth: 20,
        sweep_lookback: 5,
        reward_multiple: 2.0,
        sl_buffer_fraction: 0.001,
        paper_capital: 10_000.0,
        paper_leverage: 1.0,
        paper_fee_rate: 0.0,
        readout_throttle_ms: 0,
        redetect_throttle_ms: 0,
        ..EngineConfig::default()
    }
}

pub const TREND_BARS: i64 = 30;

/// Bottom of the bullish order block left by [`scenario_history`].
pub const OB_LOW: f64 = 129.5;
/// Top of the bullish order block left by [`scenario_history`].
pub const OB_HIGH: f64 = 131.0;

/// Thirty rising unit-body candles, one bearish candle, then a bullish impulse.
///
/// Leaves a bullish order block `[129.5, 131.0]` and an up trend; the last
/// close (140) is outside the block so the baseline signal is WAIT.
pub fn scenario_history() -> Vec<Bar> {
    let mut bars: Vec<Bar> = (0..TREND_BARS)
        .map(|i| {
            let base = 100.0 + i as f64;
            make_bar(i * 60, base, base + 1.5, base - 0.5, base + 1.0)
        })
        .collect();
    bars.push(make_bar(TREND_BARS * 60, 131.0, 131.5, 129.5, 130.0));
    bars.push(make_bar((TREND_BARS + 1) * 60, 130.0, 140.5, 129.8, 140.0));
    bars
}

pub fn scenario_time(offset: i64) -> i64 {
    (TREND_BARS + 2 + offset) * 60
}

/// Hammer closing inside the order block.
pub fn hammer(time: i64) -> Bar {
    make_bar(time, 130.6, 130.9, 128.0, 130.8)
}

pub fn scenario_port() -> MockHistoryPort {
    MockHistoryPort::new().with_bars(1, scenario_history())
}

/// Level the mirrored scenario reflects prices around.
pub const MIRROR_LEVEL: f64 = 300.0;

/// Reflects a bar around [`MIRROR_LEVEL`]: rallies become sell-offs and
/// bullish structure becomes bearish.
pub fn mirror(bar: &Bar) -> Bar {
    make_bar(
        bar.time,
        MIRROR_LEVEL - bar.open,
        MIRROR_LEVEL - bar.low,
        MIRROR_LEVEL - bar.high,
        MIRROR_LEVEL - bar.close,
    )
}

/// Falling history with a bearish order block at `[169.0, 170.5]`.
pub fn mirrored_port() -> MockHistoryPort {
    MockHistoryPort::new().with_bars(1, scenario_history().iter().map(mirror).collect())
}

pub fn engine_with(config: EngineConfig) -> (Engine, ManualClock) {
    let clock = ManualClock::new(0);
    let engine = Engine::new(config, Box::new(clock.clone())).unwrap();
    (engine, clock)
}

pub fn seeded_engine(config: EngineConfig) -> (Engine, ManualClock) {
    let (mut engine, clock) = engine_with(config);
    engine.bootstrap(&scenario_port()).unwrap();
    (engine, clock)
}

pub fn seeded_mirror_engine(config: EngineConfig) -> (Engine, ManualClock) {
    let (mut engine, clock) = engine_with(config);
    engine.bootstrap(&mirrored_port()).unwrap();
    (engine, clock)
}

/// Deterministic choppy continuation after the scenario history.
pub fn choppy_feed(n: i64) -> Vec<Bar> {
    let mut price = 135.0_f64;
    (0..n)
        .map(|i| {
            let swing = ((i * 7919) % 13) as f64 - 6.0;
            let open = price;
            let close = (price + swing * 0.4).max(1.0);
            let high = open.max(close) + ((i * 31) % 5) as f64 * 0.3 + 0.1;
            let low = (open.min(close) - ((i * 17) % 7) as f64 * 0.3 - 0.1).max(0.5);
            price = close;
            make_bar(scenario_time(i), open, high, low, close)
        })
        .collect()
}
