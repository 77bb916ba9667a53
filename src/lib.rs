//! # PMBT: Prediction Market BackTest
//!
//! **PMBT** is a Rust library for backtesting trading strategies on binary-outcome prediction
//! markets (Kalshi-style YES/NO contracts priced in cents). It turns a price history into
//! signals, simulates positions and trades, scores the run and searches strategy parameters.
//!
//! ## Why PMBT?
//! - **Exact accounting**: Prices, capital and P&L use fixed-point decimals, so long runs never drift.
//! - **Deterministic**: The same series, strategy and parameters always produce the same result.
//! - **Pluggable strategies**: The engine only depends on the [`Strategy`](strategy::Strategy) trait.
//! - **Parallel optimization**: Grid searches run on all cores and rank results reproducibly.
//!
//! ## Core Components
//! | Component   | Description                                                                                     |
//! |-------------|-------------------------------------------------------------------------------------------------|
//! | **`PriceSeries`** | Time-ordered YES/NO price observations of one market.                                   |
//! | **`SeriesCache`** | Caller-owned set of loaded series, keyed by ticker.                                     |
//! | **`Strategy`** | Turns a series into one BUY/SELL/HOLD signal per observation.                              |
//! | **`Backtest`** | Simulates positions from signals: one position per ticker, sized from current capital.     |
//! | **`MetricsReport`** | P&L, Sharpe, Sortino, Calmar, drawdown, win rate and profit factor of a run.          |
//! | **`Optimizer`** | Runs a strategy over a parameter grid and ranks the runs.                                 |
//!
//! ## Built-in Strategies
//! | Name                  | Description                                                                     |
//! |-----------------------|---------------------------------------------------------------------------------|
//! | `mean_reversion`      | Fades moves outside a rolling mean +/- k standard deviations band.              |
//! | `momentum`            | Follows moves larger than a threshold over a lookback.                          |
//! | `long_favorite`       | Backs the side priced above a favourite threshold.                              |
//! | `fade_overreaction`   | Fades sudden spikes, exits when the price retraces.                             |
//!
//! ## Performance Metrics
//! | Metric               | Description                                                                                     |
//! |----------------------|-------------------------------------------------------------------------------------------------|
//! | **Max Drawdown**     | Largest peak-to-trough decline of the equity curve, as a non-positive fraction.               |
//! | **Profit Factor**    | Ratio of gross profits to gross losses.                                                       |
//! | **Sharpe Ratio**     | Annualized risk-adjusted return.                                                              |
//! | **Sortino Ratio**    | Like Sharpe ratio, but focuses only on downside volatility.                                  |
//! | **Calmar Ratio**     | Annualized return over the max drawdown.                                                      |
//! | **Win Rate**         | Fraction of winning trades.                                                                   |
//!
//! Undefined values (a single trade, no losing trade, no drawdown) are `None`.
//!
//! ## Getting Started
//! ```rust
//! use chrono::{DateTime, Duration};
//! use pmbt_rs::prelude::*;
//! use rust_decimal::Decimal;
//!
//! fn main() -> Result<()> {
//!     let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
//!     let observations = [50, 50, 50, 50, 50, 30, 50, 50, 50, 50]
//!         .iter()
//!         .enumerate()
//!         .map(|(i, &cents)| {
//!             let yes = Decimal::from(cents);
//!             PriceObservation::new(start + Duration::hours(i as i64), yes, Decimal::ONE_HUNDRED - yes, 10)
//!         })
//!         .collect::<Result<Vec<_>>>()?;
//!     let series = PriceSeries::new("KXFED-25DEC", observations)?;
//!
//!     let params = Parameters::new().with("window", 5_i64).with("std_threshold", 1.0);
//!     let strategy = StrategyKind::MeanReversion.build(&params)?;
//!
//!     // Initialize backtest with 10,000 cents
//!     let backtest = Backtest::new(BacktestConfig::default())?;
//!     let result = backtest.run(&series, &strategy)?;
//!
//!     let metrics = MetricsReport::from(&result);
//!     assert_eq!(metrics.total_trades, 1);
//!     println!("{metrics}");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//! | Feature     | Description                                                                  |
//! |-------------|------------------------------------------------------------------------------|
//! | `optimizer` | Parallel grid search with [`rayon`](https://crates.io/crates/rayon) (default). |
//! | `serde`     | Serialize/deserialize series, results, reports and requests.                 |
//! | `wasm`      | Spin locks for rayon on WebAssembly.                                         |
//!
//! ## Logging
//! The library logs through [`tracing`](https://crates.io/crates/tracing) and never installs a
//! subscriber.
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Simulation engine: price series, positions, wallet, and backtest logic.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Performance metrics: drawdown, Sharpe ratio, win rate, etc.
pub mod metrics;

/// Strategy parameter optimization.
#[cfg(feature = "optimizer")]
pub mod optimizer;

/// Single backtest requests.
pub mod request;

/// Strategy contract, parameters and built-in strategies.
pub mod strategy;

/// Utility functions and helpers.
mod utils;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::metrics::*;
    pub use crate::request::*;
    pub use crate::strategy::*;

    #[cfg(feature = "optimizer")]
    pub use crate::optimizer::*;
}
