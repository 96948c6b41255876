//! Paper position and closed-trade records.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    #[serde(rename = "SL")]
    StopLoss,
    #[serde(rename = "TP")]
    TakeProfit,
    #[serde(rename = "MANUAL")]
    Manual,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "SL"),
            ExitReason::TakeProfit => write!(f, "TP"),
            ExitReason::Manual => write!(f, "MANUAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    pub quantity: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub entry_time: i64,
    /// Round-trip fee charged when the position was opened.
    pub fee: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == Side::Short
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.side {
            Side::Long => (price - self.entry_price) * self.quantity,
            Side::Short => (self.entry_price - price) * self.quantity,
        }
    }

    /// Long stops trigger on the bar low, short stops on the bar high.
    pub fn should_stop_loss(&self, low: f64, high: f64) -> bool {
        match self.side {
            Side::Long => low <= self.stop_loss,
            Side::Short => high >= self.stop_loss,
        }
    }

    pub fn should_take_profit(&self, low: f64, high: f64) -> bool {
        match self.side {
            Side::Long => high >= self.take_profit,
            Side::Short => low <= self.take_profit,
        }
    }
}

/// Immutable record of a closed paper position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: i64,
    pub exit_time: i64,
    pub pnl: f64,
    pub fee: f64,
    pub reason: ExitReason,
}

impl Trade {
    /// Realized P&L after the entry fee.
    pub fn net_pnl(&self) -> f64 {
        self.pnl - self.fee
    }
}
