//! OHLCV bar representation.

use serde::{Deserialize, Serialize};

use crate::domain::error::EngineError;

/// A single price bar keyed by its open time in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Bar {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// |close - open|
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// A doji (close == open) counts as bullish.
    pub fn is_bull(&self) -> bool {
        self.close >= self.open
    }

    pub fn is_bear(&self) -> bool {
        self.close < self.open
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Checks `low <= min(open, close) <= max(open, close) <= high`, positive
    /// finite prices and a non-negative volume.
    pub fn validate(&self) -> Result<(), EngineError> {
        let malformed = |reason: &str| EngineError::MalformedBar {
            time: self.time,
            reason: reason.to_string(),
        };

        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(malformed("non-finite price"));
        }
        if prices.iter().any(|&p| p <= 0.0) {
            return Err(malformed("prices must be positive"));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(malformed("volume must be non-negative"));
        }
        if self.low > self.open.min(self.close) || self.open.max(self.close) > self.high {
            return Err(malformed("open/close outside the low..high range"));
        }
        Ok(())
    }

    /// Folds a later bar of the same bucket into this one.
    pub fn merge(&mut self, later: &Bar) {
        self.high = self.high.max(later.high);
        self.low = self.low.min(later.low);
        self.close = later.close;
        self.volume += later.volume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar::new(1_700_000_000, 100.0, 110.0, 90.0, 105.0, 50_000.0)
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar();
        // high-low=20, |high-100|=10, |low-100|=10 → 20
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar();
        // high-low=20, |110-130|=20, |90-130|=40 → 40
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn body_and_wicks() {
        let bar = sample_bar();
        assert!((bar.body() - 5.0).abs() < f64::EPSILON);
        assert!((bar.upper_wick() - 5.0).abs() < f64::EPSILON);
        assert!((bar.lower_wick() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn doji_is_bull() {
        let bar = Bar::new(0, 10.0, 11.0, 9.0, 10.0, 0.0);
        assert!(bar.is_bull());
        assert!(!bar.is_bear());
    }

    #[test]
    fn validate_accepts_well_formed_bar() {
        assert!(sample_bar().validate().is_ok());
    }

    #[test]
    fn validate_rejects_close_above_high() {
        let bar = Bar::new(5, 100.0, 101.0, 99.0, 102.0, 1.0);
        let err = bar.validate().unwrap_err();
        assert!(matches!(err, EngineError::MalformedBar { time: 5, .. }));
    }

    #[test]
    fn validate_rejects_non_positive_price() {
        let bar = Bar::new(5, 0.0, 1.0, 0.0, 1.0, 1.0);
        assert!(bar.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_volume() {
        let bar = Bar::new(5, 1.0, 1.0, 1.0, 1.0, -1.0);
        assert!(bar.validate().is_err());
    }

    #[test]
    fn validate_rejects_nan() {
        let bar = Bar::new(5, f64::NAN, 1.0, 1.0, 1.0, 1.0);
        assert!(bar.validate().is_err());
    }

    #[test]
    fn merge_extends_range() {
        let mut first = Bar::new(0, 100.0, 105.0, 99.0, 104.0, 10.0);
        let later = Bar::new(60, 104.0, 108.0, 97.0, 98.0, 5.0);
        first.merge(&later);
        assert_eq!(first.time, 0);
        assert!((first.open - 100.0).abs() < f64::EPSILON);
        assert!((first.high - 108.0).abs() < f64::EPSILON);
        assert!((first.low - 97.0).abs() < f64::EPSILON);
        assert!((first.close - 98.0).abs() < f64::EPSILON);
        assert!((first.volume - 15.0).abs() < f64::EPSILON);
    }
}
