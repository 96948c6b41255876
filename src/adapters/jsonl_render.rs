//! JSON-lines render sink: one serialized [`EngineEvent`] per line.

use std::io::{self, Write};

use crate::domain::engine::EngineEvent;
use crate::domain::error::EngineError;
use crate::ports::render_port::RenderPort;

pub struct JsonLinesRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesRenderer<W> {
    pub fn new(out: W) -> Self {
        JsonLinesRenderer { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RenderPort for JsonLinesRenderer<W> {
    fn emit(&mut self, event: &EngineEvent) -> Result<(), EngineError> {
        serde_json::to_writer(&mut self.out, event).map_err(io::Error::from)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{TimeframeRole, TrendPoint};

    #[test]
    fn one_object_per_line() {
        let mut renderer = JsonLinesRenderer::new(Vec::new());
        let point = EngineEvent::Trend(TrendPoint {
            timeframe: TimeframeRole::Main,
            time: 60,
            fast: 1.5,
            slow: 1.0,
            projected: false,
        });
        renderer.emit_all(&[point.clone(), point]).unwrap();

        let text = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["event"], "trend");
        assert_eq!(value["timeframe"], "main");
        assert_eq!(value["time"], 60);
    }
}
