//! Minimum-interval gate for recomputation that may lag behind the feed.

/// Fires at most once per `interval_ms`. An interval of 0 always fires.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: u64,
    last: Option<u64>,
}

impl Throttle {
    pub fn new(interval_ms: u64) -> Self {
        Throttle {
            interval_ms,
            last: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Returns `true` and records `now_ms` when the interval has elapsed.
    pub fn ready(&mut self, now_ms: u64) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        };
        if due {
            self.last = Some(now_ms);
        }
        due
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
