//! Rejection candle: a wick that dwarfs the body.

use crate::domain::ohlcv::Bar;

pub const WICK_BODY_MULTIPLE: f64 = 1.2;

/// Either wick exceeds 1.2x the body.
pub fn is_rejection_candle(bar: &Bar) -> bool {
    let limit = bar.body() * WICK_BODY_MULTIPLE;
    bar.upper_wick() > limit || bar.lower_wick() > limit
}
