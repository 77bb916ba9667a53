use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Execution;
use crate::strategy::Parameters;

/// Capital after a closed trade.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquityPoint {
    /// When the capital was marked.
    pub timestamp: DateTime<Utc>,
    /// Capital at that time.
    pub equity: Decimal,
}

/// Output of a simulation run.
///
/// The equity curve is marked per closed trade: it starts with the initial capital at the
/// first observation and gets one point per execution, at its exit time.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    /// Ticker of a single run, or the ticker filter of a multi-ticker run.
    pub label: String,
    /// Name of the strategy that produced the signals.
    pub strategy_name: String,
    /// Parameters of the strategy.
    pub parameters: Parameters,
    /// Capital at the start of the run.
    pub initial_capital: Decimal,
    /// Capital at the end of the run.
    pub final_capital: Decimal,
    /// Closed trades, ordered by exit time.
    pub executions: Vec<Execution>,
    /// Capital after each closed trade.
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestResult {
    /// Returns the sum of the realized P&L, saturating at the decimal bounds.
    pub fn total_pnl(&self) -> Decimal {
        self.executions
            .iter()
            .fold(Decimal::ZERO, |total, e| total.saturating_add(e.pnl))
    }

    /// Returns the total return as a fraction of the initial capital.
    ///
    /// `None` for a zero initial capital or a ratio too large to represent.
    pub fn total_return(&self) -> Option<Decimal> {
        self.final_capital
            .checked_sub(self.initial_capital)?
            .checked_div(self.initial_capital)
    }

    /// Returns true if no trade was closed.
    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }

    /// Returns the equity values of the curve, in order.
    pub fn equity(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.equity_curve.iter().map(|p| p.equity)
    }
}
