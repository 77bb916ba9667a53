use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while validating inputs or running a backtest.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A strategy parameter failed validation.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A parameter holds a value of the wrong kind.
    #[error("Parameter `{name}` must be {expected}")]
    ParameterType {
        /// Parameter name.
        name: String,
        /// Expected kind (e.g. "an integer").
        expected: &'static str,
    },

    /// The strategy name does not match any built-in variant.
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// The objective name does not match any report field.
    #[error("Unknown objective metric: {0}")]
    UnknownObjective(String),

    /// The initial capital is not positive.
    #[error("Initial capital must be positive (got: {0})")]
    NegZeroCapital(Decimal),

    /// The minimum tradable unit is not positive.
    #[error("Lot size must be positive (got: {0})")]
    NegZeroLotSize(Decimal),

    /// A price is outside the `[0, 100]` cents range.
    #[error("Price out of range [0, 100]: {0}")]
    PriceOutOfRange(Decimal),

    /// Two observations are not in strictly increasing time order.
    #[error("Timestamps must be strictly increasing: {1} does not follow {0}")]
    UnorderedTimestamps(DateTime<Utc>, DateTime<Utc>),

    /// The end of a date range is not after its start.
    #[error("Invalid date range: end {1} must be after start {0}")]
    InvalidDateRange(DateTime<Utc>, DateTime<Utc>),

    /// No series is loaded for the ticker.
    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    /// The ticker filter matched no loaded series.
    #[error("No series match the ticker filter `{0}`")]
    NoMatchingSeries(String),

    /// The parameter grid has no combinations.
    #[error("Parameter grid is empty")]
    EmptyGrid,

    /// A strategy produced a signal vector that does not match the series (internal error).
    #[error("Strategy `{strategy}` produced {signals} signals for {observations} observations")]
    SignalLength {
        /// Strategy name.
        strategy: String,
        /// Number of signals produced.
        signals: usize,
        /// Number of observations in the series.
        observations: usize,
    },

    /// A second position was about to be opened for the same ticker (internal error).
    #[error("Position already open for ticker {0}")]
    PositionAlreadyOpen(String),

    /// A P&L or capital amount does not fit in a decimal (internal error).
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// The worker pool could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}
