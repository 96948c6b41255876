//! Incremental trend and volatility indicators.
//!
//! - [`ema`]: recursive fast/slow EMA state per timeframe
//! - [`atr`]: ATR-to-price volatility gauge and regime classification

pub mod atr;
pub mod ema;

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "up"),
            TrendDirection::Down => write!(f, "down"),
        }
    }
}

/// Determined trend of one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendState {
    pub fast_ema: f64,
    pub slow_ema: f64,
    pub direction: TrendDirection,
}

impl TrendState {
    pub fn from_emas(fast_ema: f64, slow_ema: f64) -> Self {
        let direction = if fast_ema > slow_ema {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        };
        TrendState {
            fast_ema,
            slow_ema,
            direction,
        }
    }
}

/// Which timeframe a trend value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeframeRole {
    Main,
    Higher,
}

/// One point of a fast/slow EMA series handed to the renderer.
///
/// `projected` points come from an in-progress bar and are display-only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub timeframe: TimeframeRole,
    pub time: i64,
    pub fast: f64,
    pub slow: f64,
    pub projected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityRegime {
    /// Below the low threshold: signals are suppressed.
    Quiet,
    Normal,
    /// Above the high threshold: informational only.
    Elevated,
}

impl fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolatilityRegime::Quiet => write!(f, "quiet"),
            VolatilityRegime::Normal => write!(f, "normal"),
            VolatilityRegime::Elevated => write!(f, "elevated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolatilityState {
    pub atr: f64,
    pub ratio: f64,
    pub regime: VolatilityRegime,
}
