//! In-memory history source, keyed by timeframe.

use std::collections::HashMap;

use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;
use crate::ports::history_port::HistoryPort;

/// Serves bars held in memory. Unknown timeframes yield no bars.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    series: HashMap<u32, Vec<Bar>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, timeframe_minutes: u32, bars: Vec<Bar>) -> Self {
        self.insert(timeframe_minutes, bars);
        self
    }

    pub fn insert(&mut self, timeframe_minutes: u32, bars: Vec<Bar>) {
        self.series.insert(timeframe_minutes, bars);
    }
}

impl HistoryPort for MemoryHistory {
    fn load_history(
        &self,
        _symbol: &str,
        timeframe_minutes: u32,
        count: usize,
    ) -> Result<Vec<Bar>, EngineError> {
        let Some(bars) = self.series.get(&timeframe_minutes) else {
            return Ok(Vec::new());
        };
        let start = bars.len().saturating_sub(count);
        Ok(bars[start..].to_vec())
    }
}
