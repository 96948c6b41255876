//! Streaming signal engine for one (symbol, timeframe) session.
//!
//! Owns the bar buffer, both timeframes' recursive trend state, the current
//! zone set, the signal tracker and the paper broker. Bars enter through
//! [`Engine::on_bar`] only after [`Engine::bootstrap`] has seeded the state
//! from history.
//!
//! Per closed bar, in order: broker stop/target check, trend updates, zone
//! redetection (heavy throttle; may lag), sweep and volatility, decision,
//! transition marker, auto-trade. In-progress bars only produce display
//! projections and throttled readouts.

use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::domain::bar_buffer::BarBuffer;
use crate::domain::broker::{BrokerStatus, PaperBroker};
use crate::domain::config::EngineConfig;
use crate::domain::config_validation::validate_engine_config;
use crate::domain::error::EngineError;
use crate::domain::indicator::atr::volatility;
use crate::domain::indicator::ema::TrendTracker;
use crate::domain::indicator::{TimeframeRole, TrendPoint, TrendState, VolatilityState};
use crate::domain::metrics::TradeStats;
use crate::domain::ohlcv::Bar;
use crate::domain::pattern::ZoneSet;
use crate::domain::pattern::fvg::detect_last_fvg;
use crate::domain::pattern::order_block::detect_order_blocks;
use crate::domain::pattern::sweep::{Sweep, detect_sweep};
use crate::domain::plan::{TradePlan, build_plan};
use crate::domain::position::Trade;
use crate::domain::signal::{Decision, DecisionInputs, Marker, Signal, SignalTracker, decide};
use crate::domain::throttle::Throttle;
use crate::domain::timeframe::{HigherTimeframe, resample};
use crate::ports::clock_port::Clock;
use crate::ports::history_port::HistoryPort;

/// Cosmetic readout refreshed under the light throttle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Readout {
    pub time: i64,
    pub last_price: f64,
    pub trend_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionUpdate {
    pub time: i64,
    pub decision: Decision,
    pub plan: Option<TradePlan>,
}

/// Everything the rendering collaborator consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Trend(TrendPoint),
    Zones(ZoneSet),
    Transition(Marker),
    Decision(DecisionUpdate),
    Trade(Trade),
    Broker(BrokerStatus),
    Readout(Readout),
}

pub struct Engine {
    config: EngineConfig,
    clock: Box<dyn Clock>,
    buffer: BarBuffer,
    main_trend: TrendTracker,
    higher: HigherTimeframe,
    zones: ZoneSet,
    zones_dirty: bool,
    sweep: Option<Sweep>,
    volatility: Option<VolatilityState>,
    decision: Decision,
    plan: Option<TradePlan>,
    tracker: SignalTracker,
    broker: PaperBroker,
    readout_throttle: Throttle,
    redetect_throttle: Throttle,
    bootstrapped: bool,
}

impl Engine {
    /// Validates `config` and builds an engine that still needs [`Engine::bootstrap`].
    pub fn new(config: EngineConfig, clock: Box<dyn Clock>) -> Result<Self, EngineError> {
        validate_engine_config(&config)?;
        Ok(Engine {
            buffer: BarBuffer::new(config.window_size),
            main_trend: TrendTracker::new(config.ema_fast_period, config.ema_slow_period),
            higher: HigherTimeframe::new(
                config.higher_timeframe_minutes,
                config.main_timeframe_minutes,
                config.ema_fast_period,
                config.ema_slow_period,
            ),
            zones: ZoneSet::default(),
            zones_dirty: false,
            sweep: None,
            volatility: None,
            decision: Decision::waiting("not bootstrapped"),
            plan: None,
            tracker: SignalTracker::with_capacity(config.window_size),
            broker: PaperBroker::new(
                config.paper_capital,
                config.paper_leverage,
                config.paper_fee_rate,
            )
            .with_curve_capacity(config.window_size),
            readout_throttle: Throttle::new(config.readout_throttle_ms),
            redetect_throttle: Throttle::new(config.redetect_throttle_ms),
            bootstrapped: false,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped
    }

    pub fn signal(&self) -> Signal {
        self.decision.signal
    }

    pub fn decision(&self) -> &Decision {
        &self.decision
    }

    pub fn plan(&self) -> Option<&TradePlan> {
        self.plan.as_ref()
    }

    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    pub fn sweep(&self) -> Option<&Sweep> {
        self.sweep.as_ref()
    }

    pub fn volatility(&self) -> Option<&VolatilityState> {
        self.volatility.as_ref()
    }

    pub fn main_trend(&self) -> Option<TrendState> {
        self.main_trend.state()
    }

    /// Persisted main-timeframe (fast, slow) EMA values.
    pub fn main_ema_values(&self) -> Option<(f64, f64)> {
        self.main_trend.values()
    }

    pub fn higher_trend(&self) -> Option<TrendState> {
        self.higher.state()
    }

    /// The newest transition markers, at most `window_size` of them.
    pub fn markers(&self) -> &VecDeque<Marker> {
        self.tracker.markers()
    }

    /// Every transition since construction, evicted markers included.
    pub fn transitions(&self) -> usize {
        self.tracker.transitions()
    }

    pub fn broker(&self) -> &PaperBroker {
        &self.broker
    }

    pub fn buffer(&self) -> &BarBuffer {
        &self.buffer
    }

    pub fn stats(&self) -> TradeStats {
        TradeStats::compute(
            self.broker.trades(),
            self.broker.account().initial_capital,
            self.broker.max_drawdown(),
        )
    }

    /// Seeds (or reseeds) every piece of recursive state from a fresh history
    /// snapshot. The paper account and trade log survive a reseed.
    ///
    /// Every history bar is treated as closed. No markers are emitted and no
    /// trades are opened; the signal of the last history bar becomes the
    /// baseline for the first transition.
    pub fn bootstrap(&mut self, history: &dyn HistoryPort) -> Result<Vec<EngineEvent>, EngineError> {
        let symbol = self.config.symbol.clone();
        let main_bars = history.load_history(
            &symbol,
            self.config.main_timeframe_minutes,
            self.config.window_size,
        )?;
        let Some(last) = main_bars.last().copied() else {
            return Err(EngineError::History {
                reason: format!(
                    "no {}m history for {symbol}",
                    self.config.main_timeframe_minutes
                ),
            });
        };

        let mut higher_bars = history.load_history(
            &symbol,
            self.config.higher_timeframe_minutes,
            self.config.htf_window_size,
        )?;
        if higher_bars.is_empty() {
            debug!(
                minutes = self.config.higher_timeframe_minutes,
                "no higher-timeframe history, resampling main bars"
            );
            higher_bars = resample(&main_bars, self.config.higher_timeframe_minutes);
        }

        let reseed = self.bootstrapped;
        self.reset_state();

        let mut events = Vec::with_capacity(main_bars.len() + higher_bars.len() + 3);
        for bar in &main_bars {
            self.buffer.append(*bar, true).map_err(|err| EngineError::History {
                reason: format!("invalid history bar: {err}"),
            })?;
            let (fast, slow) = self.main_trend.advance(bar.close);
            events.push(EngineEvent::Trend(TrendPoint {
                timeframe: TimeframeRole::Main,
                time: bar.time,
                fast,
                slow,
                projected: false,
            }));
        }

        events.extend(
            self.higher
                .seed(&higher_bars, Some(last.time))
                .into_iter()
                .map(EngineEvent::Trend),
        );

        self.redetect();
        events.push(EngineEvent::Zones(self.zones.clone()));
        self.refresh_context();
        self.evaluate(&last);
        self.tracker.set_baseline(self.decision.signal);
        self.broker.mark(last.close);
        self.bootstrapped = true;

        info!(
            symbol = %symbol,
            bars = self.buffer.len(),
            higher_bars = higher_bars.len(),
            signal = %self.decision.signal,
            reseed,
            "engine seeded from history"
        );

        events.push(self.decision_event(last.time));
        events.push(EngineEvent::Broker(self.broker.status()));
        Ok(events)
    }

    /// Sole ingestion point for the live feed.
    ///
    /// Rejected bars are logged and leave every piece of state untouched. A
    /// newer bar arriving while the previous one is still forming finalizes
    /// the forming bar first.
    pub fn on_bar(&mut self, bar: Bar, is_closed: bool) -> Result<Vec<EngineEvent>, EngineError> {
        if !self.bootstrapped {
            return Err(EngineError::NotBootstrapped);
        }
        if let Err(err) = self.check_feed(&bar) {
            warn!(time = bar.time, error = %err, "bar rejected");
            return Err(err);
        }

        let mut events = Vec::new();
        if let Some(forming) = self.superseded_forming(bar.time) {
            debug!(time = forming.time, "finalizing forming bar superseded by a newer one");
            self.close_bar(forming, &mut events)?;
        }

        if is_closed {
            self.close_bar(bar, &mut events)?;
        } else {
            self.update_forming(bar, &mut events)?;
        }
        Ok(events)
    }

    /// Closes the paper position at the latest known price.
    pub fn close_position(&mut self) -> Option<Trade> {
        let price = self.broker.last_price()?;
        let time = self.buffer.last_time()?;
        self.broker.close_at_market(price, time)
    }

    fn check_feed(&self, bar: &Bar) -> Result<(), EngineError> {
        bar.validate()?;
        match self.buffer.last_time() {
            Some(last) if bar.time < last => Err(EngineError::OutOfOrder {
                time: bar.time,
                last,
            }),
            Some(last) if bar.time == last && self.buffer.is_last_closed() => {
                Err(EngineError::BarAlreadyClosed { time: bar.time })
            }
            _ => Ok(()),
        }
    }

    fn superseded_forming(&self, time: i64) -> Option<Bar> {
        if self.buffer.is_last_closed() {
            return None;
        }
        self.buffer.last().filter(|last| time > last.time).copied()
    }

    fn close_bar(&mut self, bar: Bar, events: &mut Vec<EngineEvent>) -> Result<(), EngineError> {
        self.buffer.append(bar, true)?;

        if let Some(trade) = self.broker.on_bar_close(&bar) {
            events.push(EngineEvent::Trade(trade));
        }

        let (fast, slow) = self.main_trend.advance(bar.close);
        events.push(EngineEvent::Trend(TrendPoint {
            timeframe: TimeframeRole::Main,
            time: bar.time,
            fast,
            slow,
            projected: false,
        }));
        events.extend(
            self.higher
                .on_main_closed(&bar)
                .into_iter()
                .map(EngineEvent::Trend),
        );

        let now = self.clock.now_ms();
        if self.redetect_throttle.ready(now) {
            self.redetect();
            events.push(EngineEvent::Zones(self.zones.clone()));
        } else {
            debug!(time = bar.time, "zone redetection throttled");
            self.zones_dirty = true;
        }

        self.refresh_context();
        self.evaluate(&bar);

        if let Some(marker) = self.tracker.update(self.decision.signal, bar.time, bar.close) {
            info!(
                time = marker.time,
                signal = %marker.signal,
                label = %marker.label,
                "signal transition"
            );
            events.push(EngineEvent::Transition(marker));
            self.auto_trade(bar.time);
        }

        events.push(self.decision_event(bar.time));
        events.push(EngineEvent::Broker(self.broker.status()));
        if self.readout_throttle.ready(now) {
            events.push(EngineEvent::Readout(self.readout(&bar)));
        }
        Ok(())
    }

    fn update_forming(&mut self, bar: Bar, events: &mut Vec<EngineEvent>) -> Result<(), EngineError> {
        self.buffer.append(bar, false)?;
        self.broker.mark(bar.close);

        if self.main_trend.values().is_some() {
            let (fast, slow) = self.main_trend.project(bar.close);
            events.push(EngineEvent::Trend(TrendPoint {
                timeframe: TimeframeRole::Main,
                time: bar.time,
                fast,
                slow,
                projected: true,
            }));
        }
        if let Some(point) = self.higher.projection(Some(&bar)) {
            events.push(EngineEvent::Trend(point));
        }

        let now = self.clock.now_ms();
        if self.zones_dirty && self.redetect_throttle.ready(now) {
            self.redetect();
            events.push(EngineEvent::Zones(self.zones.clone()));
        }
        if self.readout_throttle.ready(now) {
            events.push(EngineEvent::Readout(self.readout(&bar)));
        }
        Ok(())
    }

    /// Opens a paper position on a transition to LONG/SHORT when flat.
    fn auto_trade(&mut self, time: i64) {
        if !self.config.auto_trade || !self.broker.is_flat() {
            return;
        }
        let Some(plan) = self.plan else {
            return;
        };
        self.broker
            .open(plan.side, plan.entry, plan.stop_loss, plan.take_profit, time);
    }

    fn redetect(&mut self) {
        let closed = self.buffer.closed_slice();
        self.zones = ZoneSet {
            order_blocks: detect_order_blocks(
                closed,
                self.config.ob_scan_depth,
                self.config.zone_count,
            ),
            fair_value_gap: detect_last_fvg(closed, self.config.fvg_scan_depth),
        };
        self.zones_dirty = false;
    }

    fn refresh_context(&mut self) {
        let closed = self.buffer.closed_slice();
        self.sweep = detect_sweep(closed, self.config.sweep_lookback);
        self.volatility = volatility(
            closed,
            self.config.atr_period,
            self.config.atr_low_ratio,
            self.config.atr_high_ratio,
        );
    }

    fn evaluate(&mut self, bar: &Bar) {
        let inputs = DecisionInputs {
            bar,
            main_timeframe_minutes: self.config.main_timeframe_minutes,
            signal_timeframe_minutes: self.config.signal_timeframe_minutes,
            main_trend: self.main_trend.state(),
            main_slope: self.main_trend.slope(),
            higher_trend: self.higher.state(),
            volatility: self.volatility,
            atr_low_ratio: self.config.atr_low_ratio,
            zones: &self.zones,
            sweep: self.sweep,
        };
        let decision = decide(self.config.decision_mode, &inputs);
        self.plan = match (decision.signal.side(), decision.zone.as_ref()) {
            (Some(side), Some(zone)) => Some(build_plan(
                side,
                zone,
                self.config.reward_multiple,
                self.config.sl_buffer_fraction,
            )),
            _ => None,
        };
        self.decision = decision;
    }

    fn decision_event(&self, time: i64) -> EngineEvent {
        EngineEvent::Decision(DecisionUpdate {
            time,
            decision: self.decision.clone(),
            plan: self.plan,
        })
    }

    fn readout(&self, bar: &Bar) -> Readout {
        let fast = self.config.ema_fast_period;
        let slow = self.config.ema_slow_period;
        let values = if self.buffer.is_last_closed() {
            self.main_trend.values()
        } else {
            self.main_trend
                .values()
                .map(|_| self.main_trend.project(bar.close))
        };
        let trend_text = match values {
            Some((f, s)) => format!("EMA{fast} {f:.2} / EMA{slow} {s:.2}"),
            None => format!("EMA{fast} - / EMA{slow} -"),
        };
        Readout {
            time: bar.time,
            last_price: bar.close,
            trend_text,
        }
    }

    fn reset_state(&mut self) {
        self.buffer.clear();
        self.main_trend.reset();
        self.higher.reset();
        self.zones = ZoneSet::default();
        self.zones_dirty = false;
        self.sweep = None;
        self.volatility = None;
        self.decision = Decision::waiting("not bootstrapped");
        self.plan = None;
        self.tracker.reset();
        self.readout_throttle.reset();
        self.redetect_throttle.reset();
        self.bootstrapped = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::memory_history::MemoryHistory;

    fn small_config() -> EngineConfig {
        EngineConfig {
            main_timeframe_minutes: 1,
            higher_timeframe_minutes: 5,
            signal_timeframe_minutes: 1,
            window_size: 100,
            htf_window_size: 50,
            ema_fast_period: 3,
            ema_slow_period: 6,
            atr_period: 5,
            readout_throttle_ms: 0,
            ..EngineConfig::default()
        }
    }

    fn flat_bar(i: i64, close: f64) -> Bar {
        Bar::new(i * 60, close, close + 0.5, close - 0.5, close, 1.0)
    }

    fn history(n: i64) -> MemoryHistory {
        MemoryHistory::new().with_series(
            1,
            (0..n).map(|i| flat_bar(i, 100.0 + i as f64 * 0.1)).collect(),
        )
    }

    fn engine(config: EngineConfig) -> (Engine, ManualClock) {
        let clock = ManualClock::new(0);
        let engine = Engine::new(config, Box::new(clock.clone())).unwrap();
        (engine, clock)
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig {
            ema_slow_period: 2,
            ema_fast_period: 3,
            ..small_config()
        };
        assert!(Engine::new(config, Box::new(ManualClock::new(0))).is_err());
    }

    #[test]
    fn on_bar_before_bootstrap_fails() {
        let (mut engine, _) = engine(small_config());
        let err = engine.on_bar(flat_bar(0, 100.0), true).unwrap_err();
        assert!(matches!(err, EngineError::NotBootstrapped));
    }

    #[test]
    fn empty_history_is_an_error() {
        let (mut engine, _) = engine(small_config());
        let err = engine.bootstrap(&history(0)).unwrap_err();
        assert!(matches!(err, EngineError::History { .. }));
        assert!(!engine.is_bootstrapped());
    }

    #[test]
    fn bootstrap_seeds_trends_without_markers() {
        let (mut engine, _) = engine(small_config());
        let events = engine.bootstrap(&history(40)).unwrap();
        assert!(engine.is_bootstrapped());
        assert_eq!(engine.buffer().len(), 40);
        assert!(engine.main_trend().is_some());
        // 40 minutes resampled into 5-minute buckets, the last one complete
        assert!(engine.higher_trend().is_some());
        assert!(engine.markers().is_empty());
        assert!(events.iter().all(|e| !matches!(e, EngineEvent::Transition(_))));
    }

    #[test]
    fn in_progress_updates_do_not_touch_persisted_ema() {
        let (mut engine, _) = engine(small_config());
        engine.bootstrap(&history(20)).unwrap();
        let before = engine.main_ema_values().unwrap();

        for close in [150.0, 90.0, 120.0] {
            let events = engine.on_bar(flat_bar(20, close), false).unwrap();
            assert!(events.iter().any(|e| matches!(
                e,
                EngineEvent::Trend(TrendPoint { projected: true, .. })
            )));
        }
        assert_eq!(engine.main_ema_values().unwrap(), before);
        assert!(!engine.buffer().is_last_closed());
    }

    #[test]
    fn out_of_order_and_duplicate_closed_bars_rejected() {
        let (mut engine, _) = engine(small_config());
        engine.bootstrap(&history(20)).unwrap();
        let before = engine.main_ema_values();

        let err = engine.on_bar(flat_bar(5, 100.0), true).unwrap_err();
        assert!(matches!(err, EngineError::OutOfOrder { .. }));
        let err = engine.on_bar(flat_bar(19, 100.0), true).unwrap_err();
        assert!(matches!(err, EngineError::BarAlreadyClosed { .. }));
        let bad = Bar::new(20 * 60, 100.0, 99.0, 101.0, 100.0, 1.0);
        assert!(engine.on_bar(bad, true).is_err());

        assert_eq!(engine.buffer().len(), 20);
        assert_eq!(engine.main_ema_values(), before);
    }

    #[test]
    fn newer_bar_finalizes_forming_bar() {
        let (mut engine, _) = engine(small_config());
        engine.bootstrap(&history(20)).unwrap();
        engine.on_bar(flat_bar(20, 103.0), false).unwrap();
        let events = engine.on_bar(flat_bar(21, 104.0), false).unwrap();

        let closed_points = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    EngineEvent::Trend(TrendPoint {
                        timeframe: TimeframeRole::Main,
                        projected: false,
                        ..
                    })
                )
            })
            .count();
        assert_eq!(closed_points, 1);
        assert_eq!(engine.buffer().closed_len(), 21);
    }

    #[test]
    fn heavy_throttle_defers_redetection() {
        let config = EngineConfig {
            redetect_throttle_ms: 1_000,
            ..small_config()
        };
        let (mut engine, now) = engine(config);
        engine.bootstrap(&history(20)).unwrap();

        now.set(10);
        let events = engine.on_bar(flat_bar(20, 102.0), true).unwrap();
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Zones(_))));

        now.set(500);
        let events = engine.on_bar(flat_bar(21, 102.1), true).unwrap();
        assert!(!events.iter().any(|e| matches!(e, EngineEvent::Zones(_))));
        // decision still runs on every closed bar
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Decision(_))));

        now.set(1_200);
        let events = engine.on_bar(flat_bar(22, 102.2), false).unwrap();
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Zones(_))));
    }

    #[test]
    fn readout_text() {
        let (mut engine, _) = engine(small_config());
        engine.bootstrap(&history(20)).unwrap();
        let events = engine.on_bar(flat_bar(20, 105.0), false).unwrap();
        let readout = events
            .iter()
            .find_map(|e| match e {
                EngineEvent::Readout(r) => Some(r.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(readout.last_price, 105.0);
        assert!(readout.trend_text.starts_with("EMA3 "));
        assert!(readout.trend_text.contains(" / EMA6 "));
    }

    #[test]
    fn manual_close_uses_last_price() {
        let (mut engine, _) = engine(small_config());
        engine.bootstrap(&history(20)).unwrap();
        assert!(engine.close_position().is_none());
        assert!(engine.broker.open(
            crate::domain::position::Side::Long,
            100.0,
            90.0,
            120.0,
            19 * 60
        ));
        engine.on_bar(flat_bar(20, 101.0), false).unwrap();
        let trade = engine.close_position().unwrap();
        assert_eq!(trade.exit_price, 101.0);
        assert!(engine.broker().is_flat());
    }

    #[test]
    fn events_serialize_with_tag() {
        let (mut engine, _) = engine(small_config());
        let events = engine.bootstrap(&history(20)).unwrap();
        let json = serde_json::to_string(&events[0]).unwrap();
        assert!(json.contains("\"event\":\"trend\""));
    }
}
