//! Bounded, time-ordered bar store with append / replace-last semantics.

use std::collections::VecDeque;

use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;

/// Outcome of a successful [`BarBuffer::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A new bar was pushed; `evicted` is set when the oldest bar fell out.
    Pushed { evicted: bool },
    /// The still-forming last bar was replaced in place.
    Replaced,
}

/// FIFO ring of bars. Index 0 is the oldest retained bar.
///
/// The last entry may be in progress; everything before it is closed.
#[derive(Debug, Clone)]
pub struct BarBuffer {
    bars: VecDeque<Bar>,
    capacity: usize,
    last_closed: bool,
}

impl BarBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        BarBuffer {
            bars: VecDeque::with_capacity(capacity + 1),
            capacity,
            last_closed: true,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    pub fn last_time(&self) -> Option<i64> {
        self.bars.back().map(|b| b.time)
    }

    /// Whether the last stored bar has been finalized.
    pub fn is_last_closed(&self) -> bool {
        self.last_closed
    }

    /// Number of leading bars that are closed.
    pub fn closed_len(&self) -> usize {
        if self.last_closed {
            self.bars.len()
        } else {
            self.bars.len() - 1
        }
    }

    /// Stores a bar. A later time pushes (evicting the oldest bar past capacity),
    /// an equal time replaces the in-progress last bar, an earlier time is rejected.
    /// Rejected bars leave the buffer untouched.
    ///
    /// Pushing a newer bar while the last one is still forming freezes the
    /// forming bar as closed; callers that need to run per-bar work on it must
    /// do so before pushing.
    pub fn append(&mut self, bar: Bar, closed: bool) -> Result<AppendOutcome, EngineError> {
        bar.validate()?;

        let outcome = match self.last_time() {
            Some(last) if bar.time < last => {
                return Err(EngineError::OutOfOrder {
                    time: bar.time,
                    last,
                });
            }
            Some(last) if bar.time == last => {
                if self.last_closed {
                    return Err(EngineError::BarAlreadyClosed { time: bar.time });
                }
                if let Some(slot) = self.bars.back_mut() {
                    *slot = bar;
                }
                AppendOutcome::Replaced
            }
            _ => {
                self.bars.push_back(bar);
                let evicted = self.bars.len() > self.capacity;
                if evicted {
                    self.bars.pop_front();
                }
                AppendOutcome::Pushed { evicted }
            }
        };

        self.last_closed = closed;
        Ok(outcome)
    }

    /// Contiguous view of every stored bar, in time order.
    pub fn as_slice(&mut self) -> &[Bar] {
        self.bars.make_contiguous()
    }

    /// Contiguous view of the closed bars only.
    pub fn closed_slice(&mut self) -> &[Bar] {
        let n = self.closed_len();
        &self.bars.make_contiguous()[..n]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    pub fn clear(&mut self) {
        self.bars.clear();
        self.last_closed = true;
    }
}
