//! Simulation engine.
//!
//! This module provides the fundamental types for backtesting:
//! - `PriceSeries`: Time-ordered YES/NO price observations of one market.
//! - `Position`: The open trade of a ticker, at most one at a time.
//! - `Execution`: A closed trade with its P&L and exit reason.
//! - `Wallet`: Tracks capital and realized P&L.
//! - `Backtest`: Turns strategy signals into positions, executions and an equity curve.

mod position;
mod result;
mod series;
mod wallet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::strategy::{Signal, Strategy};

pub use position::*;
pub use result::*;
pub use series::*;
pub use wallet::*;

/// Run settings shared by every simulation of a backtest.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawBacktestConfig"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktestConfig {
    /// Capital at the start of the run.
    pub initial_capital: Decimal,
    /// Minimum tradable unit, sizes are floored to a multiple of it.
    pub lot_size: Decimal,
    /// Tickers with fewer observations are skipped in multi-ticker mode.
    pub min_observations: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::from(10_000),
            lot_size: Decimal::ONE,
            min_observations: 0,
        }
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawBacktestConfig {
    initial_capital: Decimal,
    lot_size: Decimal,
    #[serde(default)]
    min_observations: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<RawBacktestConfig> for BacktestConfig {
    type Error = Error;

    fn try_from(raw: RawBacktestConfig) -> Result<Self> {
        let config = Self {
            initial_capital: raw.initial_capital,
            lot_size: raw.lot_size,
            min_observations: raw.min_observations,
        };
        config.validate()?;
        Ok(config)
    }
}

impl BacktestConfig {
    /// Creates a config with the given initial capital and default lot size.
    pub fn with_capital(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            ..Default::default()
        }
    }

    /// Checks that the capital and the lot size are positive.
    pub fn validate(&self) -> Result<()> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(Error::NegZeroCapital(self.initial_capital));
        }
        if self.lot_size <= Decimal::ZERO {
            return Err(Error::NegZeroLotSize(self.lot_size));
        }
        Ok(())
    }
}

/// Backtesting engine for trading strategies.
///
/// A run walks the series in timestamp order and, for every observation:
/// - without an open position, opens one on a BUY (long) or SELL (short) signal;
/// - with an open position, closes it when the strategy's exit rule fires
///   ([`ExitReason::SignalExit`]) or on the opposite signal ([`ExitReason::OppositeSignal`]).
///
/// A position still open on the last observation is closed there with
/// [`ExitReason::EndOfSeries`]. Positions are sized from the *current* capital:
/// `floor(position_size * capital / entry_price / lot_size) * lot_size`.
#[derive(Debug, Clone)]
pub struct Backtest {
    config: BacktestConfig,
}

impl Backtest {
    /// Creates a new backtest.
    ///
    /// ### Arguments
    /// * `config` - Initial capital, lot size and ticker filtering.
    ///
    /// ### Returns
    /// The new backtest, or an error if the capital or the lot size is not positive.
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Runs `strategy` against one series.
    ///
    /// An empty series yields an empty result, and a series too short for the strategy
    /// yields a result without executions.
    ///
    /// ### Arguments
    /// * `series` - The price history of one ticker.
    /// * `strategy` - The signal generator.
    ///
    /// ### Returns
    /// The executions and equity curve, or an error if an internal invariant was broken.
    pub fn run<S: Strategy + ?Sized>(&self, series: &PriceSeries, strategy: &S) -> Result<BacktestResult> {
        let mut wallet = Wallet::new(self.config.initial_capital)?;
        let executions = self.simulate(series, strategy, &mut wallet)?;

        let start = series.first().map(|o| o.timestamp());
        let equity_curve = equity_curve(start, wallet.initial_balance(), &executions)?;

        let result = BacktestResult {
            label: series.ticker().to_string(),
            strategy_name: strategy.name().to_string(),
            parameters: strategy.parameters(),
            initial_capital: wallet.initial_balance(),
            final_capital: wallet.balance(),
            executions,
            equity_curve,
        };
        tracing::info!(
            ticker = %result.label,
            strategy = %result.strategy_name,
            trades = result.executions.len(),
            pnl = %result.total_pnl(),
            "Backtest finished"
        );
        Ok(result)
    }

    /// Runs `strategy` against every series of `cache`, one ticker after the other.
    ///
    /// Tickers are simulated in lexicographic order and share one capital pool: each
    /// ticker starts with the capital left by the previous one. Tickers with fewer than
    /// `min_observations` observations are skipped. The combined equity curve is rebuilt
    /// from all executions ordered by exit time (ties by ticker, then entry time).
    ///
    /// ### Arguments
    /// * `cache` - The series to simulate, keyed by ticker.
    /// * `strategy` - The signal generator.
    /// * `label` - Name of the ticker selection (e.g. the ticker filter).
    ///
    /// ### Returns
    /// The combined result, or an error if an internal invariant was broken.
    pub fn run_multi_ticker<S: Strategy + ?Sized>(
        &self,
        cache: &SeriesCache,
        strategy: &S,
        label: &str,
    ) -> Result<BacktestResult> {
        let mut wallet = Wallet::new(self.config.initial_capital)?;
        let mut executions = Vec::new();
        let mut start = None;

        for series in cache.iter() {
            if series.len() < self.config.min_observations {
                tracing::debug!(
                    ticker = %series.ticker(),
                    observations = series.len(),
                    min_observations = self.config.min_observations,
                    "Skipping short series"
                );
                continue;
            }
            if let Some(first) = series.first() {
                let timestamp = first.timestamp();
                start = Some(start.map_or(timestamp, |s: DateTime<Utc>| s.min(timestamp)));
            }
            executions.extend(self.simulate(series, strategy, &mut wallet)?);
        }

        executions.sort_by(|a, b| {
            a.exit_time
                .cmp(&b.exit_time)
                .then_with(|| a.ticker.cmp(&b.ticker))
                .then_with(|| a.entry_time.cmp(&b.entry_time))
        });

        let equity_curve = equity_curve(start, wallet.initial_balance(), &executions)?;

        let result = BacktestResult {
            label: label.to_string(),
            strategy_name: strategy.name().to_string(),
            parameters: strategy.parameters(),
            initial_capital: wallet.initial_balance(),
            final_capital: wallet.balance(),
            executions,
            equity_curve,
        };
        tracing::info!(
            label = %result.label,
            strategy = %result.strategy_name,
            tickers = cache.len(),
            trades = result.executions.len(),
            pnl = %result.total_pnl(),
            "Multi-ticker backtest finished"
        );
        Ok(result)
    }

    /// Simulates one series against `wallet` and returns its executions in exit order.
    fn simulate<S: Strategy + ?Sized>(
        &self,
        series: &PriceSeries,
        strategy: &S,
        wallet: &mut Wallet,
    ) -> Result<Vec<Execution>> {
        let signals = strategy.generate_signals(series);
        if signals.len() != series.len() {
            return Err(Error::SignalLength {
                strategy: strategy.name().to_string(),
                signals: signals.len(),
                observations: series.len(),
            });
        }
        if series.len() < strategy.min_history() {
            tracing::debug!(
                ticker = %series.ticker(),
                observations = series.len(),
                min_history = strategy.min_history(),
                "Series shorter than the strategy history"
            );
        }

        let mut simulation = Simulation {
            ticker: series.ticker(),
            lot_size: self.config.lot_size,
            wallet,
            position: None,
            executions: Vec::new(),
        };
        let last_index = series.len().saturating_sub(1);

        for (index, (observation, signal)) in series.iter().zip(signals).enumerate() {
            match simulation.position.as_ref() {
                Some(position) => {
                    let reason = if strategy.exit_signal(series, index, position) {
                        Some(ExitReason::SignalExit)
                    } else {
                        match (position.side(), signal) {
                            (PositionSide::Long, Signal::Sell) | (PositionSide::Short, Signal::Buy) => {
                                Some(ExitReason::OppositeSignal)
                            }
                            _ => None,
                        }
                    };
                    if let Some(reason) = reason {
                        simulation.close_position(observation, reason)?;
                    }
                }
                None if index < last_index => {
                    let side = match signal {
                        Signal::Buy => PositionSide::Long,
                        Signal::Sell => PositionSide::Short,
                        Signal::Hold => continue,
                    };
                    simulation.open_position(index, observation, side, strategy.position_size())?;
                }
                None => {}
            }
        }

        if let (Some(last), Some(_)) = (series.last(), simulation.position.as_ref()) {
            simulation.close_position(last, ExitReason::EndOfSeries)?;
        }

        Ok(simulation.executions)
    }
}

/// Marks `initial` at `start`, then the capital after each execution at its exit time.
fn equity_curve(start: Option<DateTime<Utc>>, initial: Decimal, executions: &[Execution]) -> Result<Vec<EquityPoint>> {
    let Some(timestamp) = start else {
        return Ok(Vec::new());
    };
    let mut curve = Vec::with_capacity(executions.len() + 1);
    curve.push(EquityPoint {
        timestamp,
        equity: initial,
    });
    let mut equity = initial;
    for execution in executions {
        equity = equity.checked_add(execution.pnl).ok_or(Error::Overflow("equity curve"))?;
        curve.push(EquityPoint {
            timestamp: execution.exit_time,
            equity,
        });
    }
    Ok(curve)
}

/// Mutable state of one ticker's simulation.
struct Simulation<'a> {
    ticker: &'a str,
    lot_size: Decimal,
    wallet: &'a mut Wallet,
    position: Option<Position>,
    executions: Vec<Execution>,
}

impl Simulation<'_> {
    /// Opens a position, unless the price, the capital or the size rules it out.
    ///
    /// Entries whose worst-case P&L (a move across the whole `[0, 100]` range) could not
    /// be booked in the wallet are skipped, so closing never overflows.
    fn open_position(
        &mut self,
        index: usize,
        observation: &PriceObservation,
        side: PositionSide,
        position_size: Decimal,
    ) -> Result<()> {
        if self.position.is_some() {
            return Err(Error::PositionAlreadyOpen(self.ticker.to_string()));
        }

        let price = observation.yes_price();
        if price.is_zero() {
            tracing::debug!(ticker = %self.ticker, index, "Skipping entry at a zero price");
            return Ok(());
        }
        if !self.wallet.can_trade() {
            tracing::warn!(ticker = %self.ticker, capital = %self.wallet.balance(), "Skipping entry, capital exhausted");
            return Ok(());
        }

        let size = position_size
            .checked_mul(self.wallet.balance())
            .and_then(|budget| budget.checked_div(price))
            .and_then(|contracts| contracts.checked_div(self.lot_size))
            .and_then(|lots| lots.floor().checked_mul(self.lot_size));
        let Some(size) = size else {
            tracing::warn!(ticker = %self.ticker, index, capital = %self.wallet.balance(), "Skipping entry, notional too large");
            return Ok(());
        };
        if size <= Decimal::ZERO {
            tracing::debug!(ticker = %self.ticker, index, %price, "Skipping entry, size rounds to zero");
            return Ok(());
        }

        let bookable = size.checked_mul(Decimal::ONE_HUNDRED).is_some_and(|max_move| {
            self.wallet.balance().checked_add(max_move).is_some()
                && self.wallet.realized_pnl().checked_add(max_move).is_some()
                && self.wallet.realized_pnl().checked_sub(max_move).is_some()
        });
        if !bookable {
            tracing::warn!(ticker = %self.ticker, index, %size, capital = %self.wallet.balance(), "Skipping entry, notional too large");
            return Ok(());
        }

        let position = Position::new(self.ticker, side, index, observation.timestamp(), price, size);
        tracing::debug!(
            ticker = %self.ticker,
            side = %side,
            %price,
            %size,
            time = %observation.timestamp(),
            "Open position"
        );
        self.position = Some(position);
        Ok(())
    }

    /// Closes the open position at the YES price of `observation`.
    fn close_position(&mut self, observation: &PriceObservation, reason: ExitReason) -> Result<()> {
        let Some(position) = self.position.take() else {
            return Ok(());
        };
        let execution = position.close(observation.timestamp(), observation.yes_price(), reason)?;
        let balance = self.wallet.realize(execution.pnl)?;
        tracing::debug!(
            ticker = %self.ticker,
            side = %execution.side,
            price = %execution.exit_price,
            pnl = %execution.pnl,
            reason = %reason,
            %balance,
            "Close position"
        );
        self.executions.push(execution);
        Ok(())
    }
}
