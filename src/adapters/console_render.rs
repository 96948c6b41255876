//! Human-readable render sink.
//!
//! Prints transitions (with their reasons and plan) and closed trades; the
//! per-bar series, zones and readouts are left to richer renderers.

use std::io::Write;

use crate::adapters::csv_adapter::format_time;
use crate::domain::engine::{DecisionUpdate, EngineEvent};
use crate::domain::error::EngineError;
use crate::ports::render_port::RenderPort;

/// Reasons shown per decision.
pub const MAX_REASONS: usize = 8;

pub struct ConsoleRenderer<W: Write> {
    out: W,
    last_transition: Option<i64>,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        ConsoleRenderer {
            out,
            last_transition: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_decision(&mut self, update: &DecisionUpdate) -> Result<(), EngineError> {
        let decision = &update.decision;
        writeln!(self.out, "  {}", decision.summary)?;
        for reason in decision.reasons.iter().take(MAX_REASONS) {
            writeln!(self.out, "  - {reason}")?;
        }
        if let Some(plan) = &update.plan {
            writeln!(
                self.out,
                "  plan: entry {:.2}  stop {:.2}  target {:.2}",
                plan.entry, plan.stop_loss, plan.take_profit
            )?;
        }
        Ok(())
    }
}

impl<W: Write> RenderPort for ConsoleRenderer<W> {
    fn emit(&mut self, event: &EngineEvent) -> Result<(), EngineError> {
        match event {
            EngineEvent::Transition(marker) => {
                self.last_transition = Some(marker.time);
                writeln!(self.out, "{}  {}", format_time(marker.time), marker.label)?;
            }
            EngineEvent::Decision(update) if self.last_transition == Some(update.time) => {
                self.write_decision(update)?;
            }
            EngineEvent::Trade(trade) => {
                writeln!(
                    self.out,
                    "{}  closed {} {} @ {:.2}  pnl {:+.2}  fee {:.2}",
                    format_time(trade.exit_time),
                    trade.side,
                    trade.reason,
                    trade.exit_price,
                    trade.pnl,
                    trade.fee
                )?;
            }
            _ => {}
        }
        Ok(())
    }
}
