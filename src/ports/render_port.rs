//! Output sink for engine events.

use crate::domain::engine::EngineEvent;
use crate::domain::error::EngineError;

pub trait RenderPort {
    fn emit(&mut self, event: &EngineEvent) -> Result<(), EngineError>;

    /// Default implementation: emits each event in order.
    fn emit_all(&mut self, events: &[EngineEvent]) -> Result<(), EngineError> {
        for event in events {
            self.emit(event)?;
        }
        Ok(())
    }
}
