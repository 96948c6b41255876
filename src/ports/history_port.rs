//! Historical bar source used to bootstrap and reseed the engine.

use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;

pub trait HistoryPort {
    /// Up to `count` most recent bars of `timeframe_minutes` for `symbol`,
    /// oldest first.
    fn load_history(
        &self,
        symbol: &str,
        timeframe_minutes: u32,
        count: usize,
    ) -> Result<Vec<Bar>, EngineError>;
}
