//! Liquidity sweep / fakeout of the prior swing high or low.

use serde::Serialize;

use crate::domain::ohlcv::Bar;
use crate::domain::pattern::ZoneDirection;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sweep {
    /// Reversal context: a swept high is bearish, a swept low bullish.
    pub direction: ZoneDirection,
    /// The swing level that was breached.
    pub level: f64,
    pub time: i64,
}

/// Highest high over the `lookback` bars ending at the end of `bars`.
pub fn swing_high(bars: &[Bar], lookback: usize) -> Option<f64> {
    let start = bars.len().saturating_sub(lookback);
    bars[start..].iter().map(|b| b.high).reduce(f64::max)
}

/// Lowest low over the `lookback` bars ending at the end of `bars`.
pub fn swing_low(bars: &[Bar], lookback: usize) -> Option<f64> {
    let start = bars.len().saturating_sub(lookback);
    bars[start..].iter().map(|b| b.low).reduce(f64::min)
}

/// Tests only the last bar against the swing levels of the bars before it.
pub fn detect_sweep(bars: &[Bar], lookback: usize) -> Option<Sweep> {
    let (last, prior) = bars.split_last()?;
    let high = swing_high(prior, lookback)?;
    let low = swing_low(prior, lookback)?;

    if last.high > high && last.close < high {
        return Some(Sweep {
            direction: ZoneDirection::Bearish,
            level: high,
            time: last.time,
        });
    }
    if last.low < low && last.close > low {
        return Some(Sweep {
            direction: ZoneDirection::Bullish,
            level: low,
            time: last.time,
        });
    }
    None
}
