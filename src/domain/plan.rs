//! Entry / stop / target plan derived from a qualifying zone.

use serde::Serialize;

use crate::domain::pattern::Zone;
use crate::domain::position::Side;

/// Risk distances are floored to this so a degenerate zone still yields a plan.
pub const MIN_RISK: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradePlan {
    pub side: Side,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk: f64,
}

/// Entry at the zone midpoint, stop beyond the far edge by `sl_buffer_fraction`,
/// target at `reward_multiple` times the risk.
pub fn build_plan(side: Side, zone: &Zone, reward_multiple: f64, sl_buffer_fraction: f64) -> TradePlan {
    let entry = zone.midpoint();
    match side {
        Side::Long => {
            let stop_loss = zone.price_low * (1.0 - sl_buffer_fraction);
            let risk = (entry - stop_loss).max(MIN_RISK);
            TradePlan {
                side,
                entry,
                stop_loss,
                take_profit: entry + risk * reward_multiple,
                risk,
            }
        }
        Side::Short => {
            let stop_loss = zone.price_high * (1.0 + sl_buffer_fraction);
            let risk = (stop_loss - entry).max(MIN_RISK);
            TradePlan {
                side,
                entry,
                stop_loss,
                take_profit: entry - risk * reward_multiple,
                risk,
            }
        }
    }
}
