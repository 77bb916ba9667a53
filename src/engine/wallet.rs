use rust_decimal::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Capital pool of a simulation.
///
/// Capital only changes when a trade is realized, so the balance is also the equity
/// reported after each closed trade.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Wallet {
    // Capital at the start of the run
    initial_balance: Decimal,
    // Current capital
    balance: Decimal,
    // Cumulative realized P&L
    realized_pnl: Decimal,
}

impl Wallet {
    /// Creates a new wallet with the given initial balance.
    /// Non-positive balances are rejected.
    pub fn new(balance: Decimal) -> Result<Self> {
        if balance <= Decimal::ZERO {
            return Err(Error::NegZeroCapital(balance));
        }

        Ok(Self {
            balance,
            realized_pnl: Decimal::ZERO,
            initial_balance: balance,
        })
    }

    /// Returns the initial balance.
    pub fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }

    /// Returns the current balance.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Returns the cumulative realized P&L.
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Returns true if there is capital left to trade.
    pub fn can_trade(&self) -> bool {
        self.balance > Decimal::ZERO
    }

    /// Books a realized P&L and returns the new balance.
    ///
    /// The wallet is left unchanged if the new balance does not fit in a decimal.
    pub(crate) fn realize(&mut self, pnl: Decimal) -> Result<Decimal> {
        let balance = self.balance.checked_add(pnl).ok_or(Error::Overflow("wallet balance"))?;
        let realized_pnl = self
            .realized_pnl
            .checked_add(pnl)
            .ok_or(Error::Overflow("realized pnl"))?;
        self.balance = balance;
        self.realized_pnl = realized_pnl;
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rust_decimal_macros::dec;

    #[test]
    fn new_wallet_valid_balance() {
        let wallet = Wallet::new(dec!(100)).unwrap();
        assert_eq!(wallet.balance(), dec!(100));
        assert_eq!(wallet.initial_balance(), dec!(100));
        assert_eq!(wallet.realized_pnl(), Decimal::ZERO);
        assert!(wallet.can_trade());
    }

    #[test]
    fn new_wallet_invalid_balance() {
        let result = Wallet::new(Decimal::ZERO);
        assert!(matches!(result, Err(Error::NegZeroCapital(_))));

        let result = Wallet::new(dec!(-10));
        assert!(matches!(result, Err(Error::NegZeroCapital(_))));
    }

    #[test]
    fn realize_profit_and_loss() {
        let mut wallet = Wallet::new(dec!(100)).unwrap();
        assert_eq!(wallet.realize(dec!(12.5)), Ok(dec!(112.5)));
        assert_eq!(wallet.realize(dec!(-2.5)), Ok(dec!(110)));
        assert_eq!(wallet.realized_pnl(), dec!(10));
    }

    #[test]
    fn exhausted_wallet_cannot_trade() {
        let mut wallet = Wallet::new(dec!(100)).unwrap();
        wallet.realize(dec!(-100)).unwrap();
        assert!(!wallet.can_trade());
    }

    #[test]
    fn realize_overflow_keeps_balance() {
        let mut wallet = Wallet::new(Decimal::MAX - dec!(10)).unwrap();
        assert_eq!(wallet.realize(dec!(100)), Err(Error::Overflow("wallet balance")));
        assert_eq!(wallet.balance(), Decimal::MAX - dec!(10));
        assert_eq!(wallet.realized_pnl(), Decimal::ZERO);
        assert!(wallet.realize(dec!(-10)).is_ok());
    }
}
