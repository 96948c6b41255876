//! Signal decision pipeline and transition markers.
//!
//! Two modes turn trend, volatility and zone state into LONG / SHORT / WAIT:
//!
//! - **filter chain** (default): ordered gates, first failure short-circuits to WAIT
//! - **additive**: independent point contributions, LONG/SHORT on a 2-point lead
//!
//! Both are pure functions of [`DecisionInputs`] and are evaluated once per
//! closed main-timeframe bar.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

use crate::domain::config::DecisionMode;
use crate::domain::indicator::{TrendDirection, TrendState, VolatilityState};
use crate::domain::ohlcv::Bar;
use crate::domain::pattern::rejection::is_rejection_candle;
use crate::domain::pattern::sweep::Sweep;
use crate::domain::pattern::{Zone, ZoneDirection, ZoneSet};
use crate::domain::position::Side;

/// Point lead required by the additive mode.
pub const ADDITIVE_THRESHOLD: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Long,
    Short,
    #[default]
    Wait,
}

impl Signal {
    pub fn side(&self) -> Option<Side> {
        match self {
            Signal::Long => Some(Side::Long),
            Signal::Short => Some(Side::Short),
            Signal::Wait => None,
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Signal::Long => "long conditions dominate",
            Signal::Short => "short conditions dominate",
            Signal::Wait => "conditions unclear, waiting",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Long => write!(f, "LONG"),
            Signal::Short => write!(f, "SHORT"),
            Signal::Wait => write!(f, "WAIT"),
        }
    }
}

/// Everything a decision depends on, as of the latest closed bar.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    pub bar: &'a Bar,
    pub main_timeframe_minutes: u32,
    pub signal_timeframe_minutes: u32,
    pub main_trend: Option<TrendState>,
    pub main_slope: Option<f64>,
    pub higher_trend: Option<TrendState>,
    pub volatility: Option<VolatilityState>,
    pub atr_low_ratio: f64,
    pub zones: &'a ZoneSet,
    pub sweep: Option<Sweep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub long: i32,
    pub short: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub signal: Signal,
    /// One line per gate passed or contribution counted, plus the failing gate.
    pub reasons: Vec<String>,
    /// Zone the plan is built from.
    pub zone: Option<Zone>,
    pub score: Option<Score>,
    pub summary: String,
}

impl Decision {
    fn new(signal: Signal, reasons: Vec<String>, zone: Option<Zone>, score: Option<Score>) -> Self {
        Decision {
            signal,
            reasons,
            zone,
            score,
            summary: signal.summary().to_string(),
        }
    }

    /// WAIT with a single reason; the initial state before any bar closes.
    pub fn waiting(reason: impl Into<String>) -> Self {
        Decision::new(Signal::Wait, vec![reason.into()], None, None)
    }
}

pub fn decide(mode: DecisionMode, inputs: &DecisionInputs<'_>) -> Decision {
    match mode {
        DecisionMode::FilterChain => decide_filter_chain(inputs),
        DecisionMode::Additive => decide_additive(inputs),
    }
}

fn wait(mut reasons: Vec<String>, failed: String) -> Decision {
    debug!(gate = %failed, "filter chain stopped");
    reasons.push(failed);
    Decision::new(Signal::Wait, reasons, None, None)
}

/// Ordered gates: timeframe, higher-timeframe bias, volatility, order block,
/// close in zone, rejection candle, direction agreement.
pub fn decide_filter_chain(inputs: &DecisionInputs<'_>) -> Decision {
    let mut reasons = Vec::new();
    let close = inputs.bar.close;

    if inputs.main_timeframe_minutes != inputs.signal_timeframe_minutes {
        return wait(
            reasons,
            format!(
                "{}m is not the signal timeframe ({}m)",
                inputs.main_timeframe_minutes, inputs.signal_timeframe_minutes
            ),
        );
    }

    let Some(bias) = inputs.higher_trend else {
        return wait(reasons, "higher-timeframe trend undetermined".to_string());
    };
    reasons.push(format!("higher-timeframe bias {}", bias.direction));

    let Some(vol) = inputs.volatility else {
        return wait(reasons, "volatility undetermined".to_string());
    };
    if vol.ratio < inputs.atr_low_ratio {
        return wait(
            reasons,
            format!(
                "ATR ratio {:.5} below {:.5}, too quiet to trade",
                vol.ratio, inputs.atr_low_ratio
            ),
        );
    }
    reasons.push(format!("ATR ratio {:.5} ({})", vol.ratio, vol.regime));

    if inputs.zones.order_blocks.is_empty() {
        return wait(reasons, "no order block detected".to_string());
    }

    let Some(zone) = inputs.zones.order_block_containing(close).copied() else {
        return wait(reasons, format!("close {close:.2} outside every order block"));
    };
    reasons.push(format!("close {close:.2} inside {zone}"));

    if !is_rejection_candle(inputs.bar) {
        return wait(reasons, "no rejection candle".to_string());
    }
    reasons.push("rejection candle confirmed".to_string());

    let signal = match (zone.direction, bias.direction) {
        (ZoneDirection::Bullish, TrendDirection::Up) => Signal::Long,
        (ZoneDirection::Bearish, TrendDirection::Down) => Signal::Short,
        (zone_dir, bias_dir) => {
            return wait(
                reasons,
                format!("{zone_dir} zone against {bias_dir} bias"),
            );
        }
    };
    reasons.push(format!("{} zone agrees with {} bias", zone.direction, bias.direction));

    Decision::new(signal, reasons, Some(zone), None)
}

/// Point scoring: trend 2, slope 1, sweep 2, close in FVG 2, close in OB 2.
pub fn decide_additive(inputs: &DecisionInputs<'_>) -> Decision {
    let mut reasons = Vec::new();
    let close = inputs.bar.close;

    let Some(trend) = inputs.main_trend else {
        return wait(reasons, "trend undetermined".to_string());
    };

    let mut score = Score { long: 0, short: 0 };
    let mut add = |direction: ZoneDirection, points: i32, reason: String| {
        match direction {
            ZoneDirection::Bullish => score.long += points,
            ZoneDirection::Bearish => score.short += points,
        }
        reasons.push(reason);
    };

    match trend.direction {
        TrendDirection::Up => add(ZoneDirection::Bullish, 2, "fast EMA above slow EMA".to_string()),
        TrendDirection::Down => add(ZoneDirection::Bearish, 2, "fast EMA below slow EMA".to_string()),
    }

    if let Some(slope) = inputs.main_slope {
        if slope > 0.0 {
            add(ZoneDirection::Bullish, 1, "fast EMA slope rising".to_string());
        } else {
            add(ZoneDirection::Bearish, 1, "fast EMA slope falling".to_string());
        }
    }

    if let Some(sweep) = inputs.sweep {
        let side = match sweep.direction {
            ZoneDirection::Bullish => "low",
            ZoneDirection::Bearish => "high",
        };
        add(
            sweep.direction,
            2,
            format!("swept {side} {:.2} and closed back", sweep.level),
        );
    }

    if let Some(fvg) = inputs.zones.fair_value_gap.filter(|z| z.contains(close)) {
        add(fvg.direction, 2, format!("close back inside {fvg}"));
    }

    if let Some(ob) = inputs.zones.order_block_containing(close) {
        add(ob.direction, 2, format!("close touching {ob}"));
    }

    let diff = score.long - score.short;
    let signal = if diff >= ADDITIVE_THRESHOLD {
        Signal::Long
    } else if diff <= -ADDITIVE_THRESHOLD {
        Signal::Short
    } else {
        Signal::Wait
    };

    let zone = signal
        .side()
        .and_then(|side| plan_zone(inputs.zones, close, side));
    Decision::new(signal, reasons, zone, Some(score))
}

/// Zone containing the close whose direction agrees with `side`, order blocks
/// first. A plan is never built from a zone the bar did not trade through.
fn plan_zone(zones: &ZoneSet, close: f64, side: Side) -> Option<Zone> {
    let direction = match side {
        Side::Long => ZoneDirection::Bullish,
        Side::Short => ZoneDirection::Bearish,
    };
    zones
        .iter()
        .find(|z| z.direction == direction && z.contains(close))
        .copied()
}

/// Discrete event emitted when the signal changes between closed bars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub time: i64,
    pub signal: Signal,
    pub label: String,
}

/// Markers kept by [`SignalTracker::new`].
pub const DEFAULT_MARKER_CAPACITY: usize = 500;

/// Remembers the previous closed-bar signal and records transitions.
///
/// Only the newest `capacity` markers are retained; `transitions` counts all.
#[derive(Debug, Clone)]
pub struct SignalTracker {
    previous: Signal,
    markers: VecDeque<Marker>,
    capacity: usize,
    transitions: usize,
}

impl Default for SignalTracker {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MARKER_CAPACITY)
    }
}

impl SignalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SignalTracker {
            previous: Signal::Wait,
            markers: VecDeque::with_capacity(capacity),
            capacity,
            transitions: 0,
        }
    }

    pub fn previous(&self) -> Signal {
        self.previous
    }

    /// Retained markers, oldest first.
    pub fn markers(&self) -> &VecDeque<Marker> {
        &self.markers
    }

    /// Transitions recorded since construction, including evicted markers.
    pub fn transitions(&self) -> usize {
        self.transitions
    }

    /// Sets the prior signal without emitting a marker.
    pub fn set_baseline(&mut self, signal: Signal) {
        self.previous = signal;
    }

    /// Records `signal` for a closed bar; returns a marker only on change.
    pub fn update(&mut self, signal: Signal, time: i64, close: f64) -> Option<Marker> {
        if signal == self.previous {
            return None;
        }
        self.previous = signal;
        let marker = Marker {
            time,
            signal,
            label: format!("{signal} {close:.2}"),
        };
        if self.markers.len() == self.capacity {
            self.markers.pop_front();
        }
        self.markers.push_back(marker.clone());
        self.transitions += 1;
        Some(marker)
    }

    /// Forgets the previous signal. Markers already emitted are kept.
    pub fn reset(&mut self) {
        self.previous = Signal::Wait;
    }
}
