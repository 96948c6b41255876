//! Virtual single-position broker.
//!
//! Flat -> Open -> Flat. Positions are sized with the whole balance times
//! leverage, pay the full round-trip fee up front, and close when a closed
//! bar's range touches the stop or the target (stop checked first).

use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info};

use super::account::{Account, EquityPoint};
use super::metrics::Drawdown;
use super::ohlcv::Bar;
use super::position::{ExitReason, Position, Side, Trade};

/// Snapshot handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerStatus {
    pub balance: f64,
    pub equity: f64,
    pub position: Option<Position>,
    /// Most recent first.
    pub trades: Vec<Trade>,
}

/// Equity points kept by [`PaperBroker::new`].
pub const DEFAULT_CURVE_CAPACITY: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct PaperBroker {
    account: Account,
    position: Option<Position>,
    trades: Vec<Trade>,
    equity_curve: VecDeque<EquityPoint>,
    curve_capacity: usize,
    drawdown: Drawdown,
    last_price: Option<f64>,
}

impl PaperBroker {
    pub fn new(capital: f64, leverage: f64, fee_rate: f64) -> Self {
        PaperBroker {
            account: Account::new(capital, leverage, fee_rate),
            position: None,
            trades: Vec::new(),
            equity_curve: VecDeque::new(),
            curve_capacity: DEFAULT_CURVE_CAPACITY,
            drawdown: Drawdown::default(),
            last_price: None,
        }
    }

    /// Keeps only the newest `capacity` equity points. Drawdown still spans
    /// every bar.
    pub fn with_curve_capacity(mut self, capacity: usize) -> Self {
        self.curve_capacity = capacity.max(1);
        while self.equity_curve.len() > self.curve_capacity {
            self.equity_curve.pop_front();
        }
        self
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    /// Closed trades in the order they were closed.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn trades_recent_first(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().rev()
    }

    /// Recent equity marks, oldest first.
    pub fn equity_curve(&self) -> &VecDeque<EquityPoint> {
        &self.equity_curve
    }

    /// Largest peak-to-trough equity fall over every closed bar.
    pub fn max_drawdown(&self) -> f64 {
        self.drawdown.max()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.last_price
    }

    /// Records the latest known price for equity.
    pub fn mark(&mut self, price: f64) {
        self.last_price = Some(price);
    }

    pub fn equity(&self) -> f64 {
        self.account.equity(self.position.as_ref(), self.last_price)
    }

    /// Opens a position. Returns `false` without side effects when one is
    /// already open or the entry cannot be sized.
    pub fn open(
        &mut self,
        side: Side,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
        time: i64,
    ) -> bool {
        if self.position.is_some() {
            debug!(time, "paper open ignored: position already open");
            return false;
        }
        let balance = self.account.balance;
        if entry_price.is_nan() || entry_price <= 0.0 || balance.is_nan() || balance <= 0.0 {
            debug!(time, entry_price, "paper open ignored: cannot size position");
            return false;
        }

        let quantity = self.account.position_quantity(entry_price);
        let fee = self.account.round_trip_fee(entry_price, quantity);
        self.account.balance -= fee;

        self.position = Some(Position {
            side,
            entry_price,
            quantity,
            stop_loss,
            take_profit,
            entry_time: time,
            fee,
        });
        info!(
            %side,
            entry_price,
            stop_loss,
            take_profit,
            quantity,
            fee,
            "paper position opened"
        );
        true
    }

    /// Realizes the open position at `exit_price`. No-op when flat.
    pub fn close(&mut self, exit_price: f64, reason: ExitReason, time: i64) -> Option<Trade> {
        let pos = self.position.take()?;
        let pnl = pos.unrealized_pnl(exit_price);
        self.account.balance += pnl;

        let trade = Trade {
            side: pos.side,
            quantity: pos.quantity,
            entry_price: pos.entry_price,
            exit_price,
            entry_time: pos.entry_time,
            exit_time: time,
            pnl,
            fee: pos.fee,
            reason,
        };
        info!(
            side = %trade.side,
            exit_price,
            %reason,
            pnl,
            balance = self.account.balance,
            "paper position closed"
        );
        self.trades.push(trade.clone());
        Some(trade)
    }

    /// Closes at `price` with reason `MANUAL`.
    pub fn close_at_market(&mut self, price: f64, time: i64) -> Option<Trade> {
        self.mark(price);
        self.close(price, ExitReason::Manual, time)
    }

    /// Stop/target check for one closed bar, then marks equity at its close.
    ///
    /// When the bar spans both levels the stop wins.
    pub fn on_bar_close(&mut self, bar: &Bar) -> Option<Trade> {
        let exit = self.position.as_ref().and_then(|pos| {
            if pos.should_stop_loss(bar.low, bar.high) {
                Some((pos.stop_loss, ExitReason::StopLoss))
            } else if pos.should_take_profit(bar.low, bar.high) {
                Some((pos.take_profit, ExitReason::TakeProfit))
            } else {
                None
            }
        });

        let trade = exit.and_then(|(price, reason)| self.close(price, reason, bar.time));

        self.mark(bar.close);
        let equity = self.equity();
        self.drawdown.record(equity);
        if self.equity_curve.len() == self.curve_capacity {
            self.equity_curve.pop_front();
        }
        self.equity_curve.push_back(EquityPoint {
            time: bar.time,
            equity,
        });
        trade
    }

    pub fn status(&self) -> BrokerStatus {
        BrokerStatus {
            balance: self.account.balance,
            equity: self.equity(),
            position: self.position,
            trades: self.trades_recent_first().cloned().collect(),
        }
    }
}
