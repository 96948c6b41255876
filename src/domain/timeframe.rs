//! Higher-timeframe bucketing and the independent higher-timeframe trend.

use crate::domain::indicator::ema::TrendTracker;
use crate::domain::indicator::{TimeframeRole, TrendPoint, TrendState};
use crate::domain::ohlcv::Bar;

/// Start of the bucket of `minutes` containing `time` (epoch seconds).
pub fn bucket_start(time: i64, minutes: u32) -> i64 {
    let secs = i64::from(minutes.max(1)) * 60;
    time.div_euclid(secs) * secs
}

/// Aggregates time-ordered bars into buckets of `minutes`.
pub fn resample(bars: &[Bar], minutes: u32) -> Vec<Bar> {
    let mut out: Vec<Bar> = Vec::new();
    for bar in bars {
        let start = bucket_start(bar.time, minutes);
        match out.last_mut() {
            Some(current) if current.time == start => current.merge(bar),
            _ => out.push(Bar { time: start, ..*bar }),
        }
    }
    out
}

/// Builds the higher-timeframe bar series from closed main bars and keeps its
/// own recursive EMA state. The EMA advances exactly once per completed bucket.
#[derive(Debug, Clone)]
pub struct HigherTimeframe {
    minutes: u32,
    main_minutes: u32,
    forming: Option<Bar>,
    trend: TrendTracker,
}

impl HigherTimeframe {
    pub fn new(minutes: u32, main_minutes: u32, fast_period: usize, slow_period: usize) -> Self {
        HigherTimeframe {
            minutes,
            main_minutes,
            forming: None,
            trend: TrendTracker::new(fast_period, slow_period),
        }
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn trend(&self) -> &TrendTracker {
        &self.trend
    }

    pub fn state(&self) -> Option<TrendState> {
        self.trend.state()
    }

    pub fn forming(&self) -> Option<&Bar> {
        self.forming.as_ref()
    }

    fn bucket_secs(&self) -> i64 {
        i64::from(self.minutes) * 60
    }

    fn main_secs(&self) -> i64 {
        i64::from(self.main_minutes) * 60
    }

    /// Seeds from a higher-timeframe history snapshot. Buckets that end after
    /// the last main bar (`main_last_time`) are still forming and are kept open.
    pub fn seed(&mut self, history: &[Bar], main_last_time: Option<i64>) -> Vec<TrendPoint> {
        self.reset();
        let horizon = main_last_time.map(|t| t + self.main_secs());
        let mut points = Vec::new();

        for bar in history {
            if let Some(last) = main_last_time {
                if bar.time > last {
                    break;
                }
            }
            let complete = match horizon {
                Some(h) => bar.time + self.bucket_secs() <= h,
                None => true,
            };
            if complete {
                points.push(self.close_bucket(*bar));
            } else {
                self.forming = Some(*bar);
            }
        }
        points
    }

    /// Folds a closed main bar into the forming bucket and closes buckets that
    /// are complete. Returns the closed higher-timeframe points.
    pub fn on_main_closed(&mut self, bar: &Bar) -> Vec<TrendPoint> {
        let start = bucket_start(bar.time, self.minutes);
        let mut points = Vec::new();

        match self.forming.take() {
            Some(mut current) if current.time == start => {
                current.merge(bar);
                self.forming = Some(current);
            }
            Some(stale) => {
                // A gap skipped the bar that would have completed this bucket.
                points.push(self.close_bucket(stale));
                self.forming = Some(Bar { time: start, ..*bar });
            }
            None => self.forming = Some(Bar { time: start, ..*bar }),
        }

        if bar.time + self.main_secs() >= start + self.bucket_secs() {
            if let Some(done) = self.forming.take() {
                points.push(self.close_bucket(done));
            }
        }
        points
    }

    /// Display-only point for the forming bucket, optionally including an
    /// in-progress main bar.
    pub fn projection(&self, in_progress: Option<&Bar>) -> Option<TrendPoint> {
        let close = match (in_progress, self.forming.as_ref()) {
            (Some(bar), _) => bar.close,
            (None, Some(forming)) => forming.close,
            (None, None) => return None,
        };
        self.trend.values()?;
        let time = self
            .forming
            .map(|f| f.time)
            .or_else(|| in_progress.map(|b| bucket_start(b.time, self.minutes)))?;
        let (fast, slow) = self.trend.project(close);
        Some(TrendPoint {
            timeframe: TimeframeRole::Higher,
            time,
            fast,
            slow,
            projected: true,
        })
    }

    fn close_bucket(&mut self, bar: Bar) -> TrendPoint {
        let (fast, slow) = self.trend.advance(bar.close);
        TrendPoint {
            timeframe: TimeframeRole::Higher,
            time: bar.time,
            fast,
            slow,
            projected: false,
        }
    }

    pub fn reset(&mut self) {
        self.forming = None;
        self.trend.reset();
    }
}
