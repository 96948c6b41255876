//! Paper-trading statistics computed from the trade log.

use serde::Serialize;

use super::position::Trade;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    /// Sum of net P&L (fees included).
    pub realized_pnl: f64,
    pub profit_factor: f64,
    /// Fraction of initial capital.
    pub total_return: f64,
    pub max_drawdown: f64,
}

impl TradeStats {
    /// Trades are classified by net P&L; break-even trades count as neither.
    pub fn compute(trades: &[Trade], initial_capital: f64, max_drawdown: f64) -> Self {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut gross_wins = 0.0_f64;
        let mut gross_losses = 0.0_f64;

        for trade in trades {
            let pnl = trade.net_pnl();
            if pnl > 0.0 {
                wins += 1;
                gross_wins += pnl;
            } else if pnl < 0.0 {
                losses += 1;
                gross_losses += pnl.abs();
            }
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            wins as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if gross_losses > 0.0 {
            gross_wins / gross_losses
        } else if gross_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let realized_pnl = gross_wins - gross_losses;
        let total_return = if initial_capital > 0.0 {
            realized_pnl / initial_capital
        } else {
            0.0
        };

        TradeStats {
            total_trades,
            wins,
            losses,
            win_rate,
            realized_pnl,
            profit_factor,
            total_return,
            max_drawdown,
        }
    }
}

/// Running peak-to-trough tracker, fed one equity sample at a time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Drawdown {
    peak: Option<f64>,
    max: f64,
}

impl Drawdown {
    pub fn record(&mut self, equity: f64) {
        match self.peak {
            Some(peak) if equity <= peak => {
                if peak > 0.0 {
                    self.max = self.max.max((peak - equity) / peak);
                }
            }
            _ => self.peak = Some(equity),
        }
    }

    /// Largest fall seen so far as a fraction of the peak before it.
    pub fn max(&self) -> f64 {
        self.max
    }
}
