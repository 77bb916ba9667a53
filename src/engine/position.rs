use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Direction of a position.
///
/// `Long` buys the YES side, `Short` buys the NO side (sells YES).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionSide {
    /// Profits when the YES price rises.
    Long,
    /// Profits when the YES price falls.
    Short,
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Why a position was closed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    /// The strategy's own exit rule fired (e.g. price back in the neutral band).
    SignalExit,
    /// A signal in the opposite direction fired.
    OppositeSignal,
    /// The series ended with the position still open.
    EndOfSeries,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignalExit => write!(f, "SIGNAL_EXIT"),
            Self::OppositeSignal => write!(f, "OPPOSITE_SIGNAL"),
            Self::EndOfSeries => write!(f, "END_OF_SERIES"),
        }
    }
}

/// An open trade.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    ticker: String,
    side: PositionSide,
    entry_index: usize,
    entry_time: DateTime<Utc>,
    entry_price: Decimal,
    size: Decimal,
}

impl Position {
    pub(crate) fn new(
        ticker: impl Into<String>,
        side: PositionSide,
        entry_index: usize,
        entry_time: DateTime<Utc>,
        entry_price: Decimal,
        size: Decimal,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            side,
            entry_index,
            entry_time,
            entry_price,
            size,
        }
    }

    /// Returns the ticker.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Returns the side.
    pub fn side(&self) -> PositionSide {
        self.side
    }

    /// Returns the index of the observation the position was opened on.
    pub fn entry_index(&self) -> usize {
        self.entry_index
    }

    /// Returns the entry time.
    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    /// Returns the entry price in cents.
    pub fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    /// Returns the number of contracts.
    pub fn size(&self) -> Decimal {
        self.size
    }

    /// Returns the capital committed at entry.
    pub fn cost(&self) -> Result<Decimal> {
        self.entry_price
            .checked_mul(self.size)
            .ok_or(Error::Overflow("position cost"))
    }

    /// Estimates the P&L if the position were closed at `exit_price`.
    ///
    /// ### Returns
    /// The P&L, or [`Error::Overflow`] if it does not fit in a decimal.
    pub fn estimate_pnl(&self, exit_price: Decimal) -> Result<Decimal> {
        let move_in_favor = match self.side {
            PositionSide::Long => exit_price.checked_sub(self.entry_price),
            PositionSide::Short => self.entry_price.checked_sub(exit_price),
        };
        move_in_favor
            .and_then(|m| m.checked_mul(self.size))
            .ok_or(Error::Overflow("position pnl"))
    }

    /// Closes the position and returns the resulting execution.
    pub(crate) fn close(
        self,
        exit_time: DateTime<Utc>,
        exit_price: Decimal,
        exit_reason: ExitReason,
    ) -> Result<Execution> {
        let pnl = self.estimate_pnl(exit_price)?;
        Ok(Execution {
            ticker: self.ticker,
            side: self.side,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_time,
            exit_price,
            size: self.size,
            pnl,
            exit_reason,
        })
    }
}

/// A closed trade.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Market ticker.
    pub ticker: String,
    /// Direction of the trade.
    pub side: PositionSide,
    /// Entry time.
    pub entry_time: DateTime<Utc>,
    /// Entry price in cents.
    pub entry_price: Decimal,
    /// Exit time, always after the entry time.
    pub exit_time: DateTime<Utc>,
    /// Exit price in cents.
    pub exit_price: Decimal,
    /// Number of contracts, always positive.
    pub size: Decimal,
    /// Realized profit and loss.
    pub pnl: Decimal,
    /// Why the trade was closed.
    pub exit_reason: ExitReason,
}

impl Execution {
    /// Returns true if the trade made money.
    pub fn is_winner(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    /// Returns true if the trade lost money.
    pub fn is_loser(&self) -> bool {
        self.pnl < Decimal::ZERO
    }

    /// Returns the P&L as a percentage of the committed capital.
    ///
    /// `None` when the committed capital is zero or too large to represent.
    pub fn return_pct(&self) -> Option<Decimal> {
        let cost = self.entry_price.checked_mul(self.size).filter(|c| !c.is_zero())?;
        self.pnl.checked_div(cost)?.checked_mul(Decimal::ONE_HUNDRED)
    }
}
