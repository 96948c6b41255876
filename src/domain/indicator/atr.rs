//! Volatility gauge: simple-mean ATR over the last N closed bars as a ratio to price.

use crate::domain::indicator::{VolatilityRegime, VolatilityState};
use crate::domain::ohlcv::Bar;

/// Simple mean of the true range over the last `period` bars.
///
/// Needs `period + 1` bars so every true range has a previous close.
pub fn calc_atr(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let start = bars.len() - period;
    let sum: f64 = (start..bars.len())
        .map(|i| bars[i].true_range(bars[i - 1].close))
        .sum();
    Some(sum / period as f64)
}

/// Classifies a ratio against the two thresholds.
pub fn classify(ratio: f64, low_ratio: f64, high_ratio: f64) -> VolatilityRegime {
    if ratio < low_ratio {
        VolatilityRegime::Quiet
    } else if ratio > high_ratio {
        VolatilityRegime::Elevated
    } else {
        VolatilityRegime::Normal
    }
}

/// ATR ratio and regime for the latest closed bar, `None` when undetermined.
pub fn volatility(
    bars: &[Bar],
    period: usize,
    low_ratio: f64,
    high_ratio: f64,
) -> Option<VolatilityState> {
    let atr = calc_atr(bars, period)?;
    let last_close = bars.last()?.close;
    if last_close <= 0.0 {
        return None;
    }
    let ratio = atr / last_close;
    Some(VolatilityState {
        atr,
        ratio,
        regime: classify(ratio, low_ratio, high_ratio),
    })
}
