//! Exponential Moving Average, recomputed incrementally per closed bar.
//!
//! k = 2/(n+1), seed with the first close, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! The persisted value advances once per closed bar; in-progress bars only
//! produce display projections from it.

use std::collections::VecDeque;

use crate::domain::indicator::TrendState;

/// Bars between the two fast-EMA samples used for the slope.
pub const SLOPE_LOOKBACK: usize = 5;

/// One recursive EMA step. An unset `previous` seeds with `price`.
pub fn ema_next(previous: Option<f64>, price: f64, period: usize) -> f64 {
    match previous {
        None => price,
        Some(prev) => {
            let k = 2.0 / (period as f64 + 1.0);
            price * k + prev * (1.0 - k)
        }
    }
}

/// Full EMA series over a list of closes, seeded with the first close.
pub fn calculate_ema(closes: &[f64], period: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(closes.len());
    let mut prev = None;
    for &close in closes {
        let value = ema_next(prev, close, period);
        out.push(value);
        prev = Some(value);
    }
    out
}

/// A single persisted EMA.
#[derive(Debug, Clone, PartialEq)]
pub struct EmaState {
    period: usize,
    value: Option<f64>,
}

impl EmaState {
    pub fn new(period: usize) -> Self {
        EmaState {
            period,
            value: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Advances the persisted state with a closed bar's close.
    pub fn advance(&mut self, close: f64) -> f64 {
        let next = ema_next(self.value, close, self.period);
        self.value = Some(next);
        next
    }

    /// Display-only value for an in-progress close; never mutates the state.
    pub fn project(&self, close: f64) -> f64 {
        ema_next(self.value, close, self.period)
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// Fast/slow EMA pair for one timeframe plus the fast-EMA history for the slope.
#[derive(Debug, Clone)]
pub struct TrendTracker {
    fast: EmaState,
    slow: EmaState,
    fast_history: VecDeque<f64>,
    closed_bars: usize,
    min_bars: usize,
}

impl TrendTracker {
    /// The trend is reported as determined once `slow_period` closed bars were seen.
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        TrendTracker {
            fast: EmaState::new(fast_period),
            slow: EmaState::new(slow_period),
            fast_history: VecDeque::with_capacity(SLOPE_LOOKBACK + 1),
            closed_bars: 0,
            min_bars: slow_period.max(1),
        }
    }

    pub fn closed_bars(&self) -> usize {
        self.closed_bars
    }

    pub fn is_determined(&self) -> bool {
        self.closed_bars >= self.min_bars
    }

    /// Advances both EMAs exactly once for a closed bar and returns (fast, slow).
    pub fn advance(&mut self, close: f64) -> (f64, f64) {
        let fast = self.fast.advance(close);
        let slow = self.slow.advance(close);
        self.closed_bars += 1;
        self.fast_history.push_back(fast);
        if self.fast_history.len() > SLOPE_LOOKBACK + 1 {
            self.fast_history.pop_front();
        }
        (fast, slow)
    }

    /// Display projection for an in-progress close.
    pub fn project(&self, close: f64) -> (f64, f64) {
        (self.fast.project(close), self.slow.project(close))
    }

    /// Persisted (fast, slow), if at least one bar was seen.
    pub fn values(&self) -> Option<(f64, f64)> {
        Some((self.fast.value()?, self.slow.value()?))
    }

    /// Trend state, or `None` while undetermined.
    pub fn state(&self) -> Option<TrendState> {
        if !self.is_determined() {
            return None;
        }
        let (fast, slow) = self.values()?;
        Some(TrendState::from_emas(fast, slow))
    }

    /// fast(now) - fast(now - 5 closed bars).
    pub fn slope(&self) -> Option<f64> {
        if self.fast_history.len() < SLOPE_LOOKBACK + 1 {
            return None;
        }
        let now = self.fast_history.back()?;
        let then = self.fast_history.front()?;
        Some(now - then)
    }

    pub fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.fast_history.clear();
        self.closed_bars = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ema_seed_is_first_price() {
        assert_relative_eq!(ema_next(None, 42.0, 10), 42.0);
    }

    #[test]
    fn ema_recursive_calculation() {
        let series = calculate_ema(&[10.0, 20.0, 30.0], 3);
        let k = 2.0 / 4.0;
        let e1 = 20.0 * k + 10.0 * (1.0 - k);
        let e2 = 30.0 * k + e1 * (1.0 - k);
        assert_relative_eq!(series[0], 10.0);
        assert_relative_eq!(series[1], e1);
        assert_relative_eq!(series[2], e2);
    }

    #[test]
    fn ema_period_1_tracks_price() {
        let series = calculate_ema(&[10.0, 20.0, 30.0], 1);
        assert_relative_eq!(series[2], 30.0);
    }

    #[test]
    fn ema_equal_prices() {
        let series = calculate_ema(&[100.0; 5], 3);
        for v in series {
            assert_relative_eq!(v, 100.0);
        }
    }

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 3).is_empty());
    }

    #[test]
    fn project_does_not_mutate() {
        let mut ema = EmaState::new(3);
        ema.advance(10.0);
        let before = ema.value();
        let projected = ema.project(50.0);
        assert_eq!(ema.value(), before);
        assert_relative_eq!(projected, 50.0 * 0.5 + 10.0 * 0.5);
    }

    #[test]
    fn tracker_undetermined_until_slow_period() {
        let mut t = TrendTracker::new(2, 4);
        for close in [1.0, 2.0, 3.0] {
            t.advance(close);
            assert!(t.state().is_none());
        }
        t.advance(4.0);
        let state = t.state().unwrap();
        assert!(state.fast_ema > state.slow_ema);
    }

    #[test]
    fn slope_needs_six_samples() {
        let mut t = TrendTracker::new(3, 5);
        for i in 0..5 {
            t.advance(100.0 + i as f64);
        }
        assert!(t.slope().is_none());
        t.advance(105.0);
        let fast: Vec<f64> = calculate_ema(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0], 3);
        assert_relative_eq!(t.slope().unwrap(), fast[5] - fast[0]);
    }

    #[test]
    fn slope_window_slides() {
        let mut t = TrendTracker::new(3, 5);
        let closes = [100.0, 99.0, 98.0, 97.0, 96.0, 95.0, 94.0, 93.0];
        for c in closes {
            t.advance(c);
        }
        let fast = calculate_ema(&closes, 3);
        assert_relative_eq!(t.slope().unwrap(), fast[7] - fast[2]);
        assert!(t.slope().unwrap() < 0.0);
    }

    #[test]
    fn reset_clears_state() {
        let mut t = TrendTracker::new(2, 3);
        for c in [1.0, 2.0, 3.0] {
            t.advance(c);
        }
        t.reset();
        assert_eq!(t.closed_bars(), 0);
        assert!(t.values().is_none());
        assert!(t.slope().is_none());
    }
}
