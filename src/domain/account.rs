//! Paper account: realized balance plus sizing parameters.

use serde::Serialize;

use super::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub time: i64,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// Realized balance only.
    pub balance: f64,
    pub initial_capital: f64,
    pub leverage: f64,
    /// Round-trip fee rate.
    pub fee_rate: f64,
}

impl Account {
    pub fn new(initial_capital: f64, leverage: f64, fee_rate: f64) -> Self {
        Account {
            balance: initial_capital,
            initial_capital,
            leverage,
            fee_rate,
        }
    }

    /// Quantity bought with the whole balance at `leverage`.
    pub fn position_quantity(&self, entry_price: f64) -> f64 {
        (self.balance * self.leverage) / entry_price
    }

    /// entry_price * quantity * fee_rate
    pub fn round_trip_fee(&self, entry_price: f64, quantity: f64) -> f64 {
        entry_price * quantity * self.fee_rate
    }

    /// Balance plus the unrealized P&L of `position` at `price`.
    pub fn equity(&self, position: Option<&Position>, price: Option<f64>) -> f64 {
        match (position, price) {
            (Some(pos), Some(price)) => self.balance + pos.unrealized_pnl(price),
            _ => self.balance,
        }
    }

    pub fn return_pct(&self) -> f64 {
        (self.balance - self.initial_capital) / self.initial_capital * 100.0
    }
}
