//! Time source for the engine's throttles.

/// Milliseconds from an arbitrary, monotonic origin.
pub trait Clock {
    fn now_ms(&self) -> u64;
}
