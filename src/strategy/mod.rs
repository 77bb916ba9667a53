//! Strategy contract and built-in strategies.
//!
//! A strategy is a pure function from a [`PriceSeries`] to one [`Signal`] per observation.
//! It knows nothing about capital or positions: the simulation engine only depends on
//! this contract, so new variants plug in without touching it.

mod fade_overreaction;
mod long_favorite;
mod mean_reversion;
mod momentum;
mod params;

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{Position, PriceSeries};
use crate::errors::{Error, Result};

pub use fade_overreaction::*;
pub use long_favorite::*;
pub use mean_reversion::*;
pub use momentum::*;
pub use params::*;

/// Fraction of capital committed per trade when none is given.
pub const DEFAULT_POSITION_SIZE: f64 = 0.1;

/// Discrete trading signal for one observation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    /// Open a long position.
    Buy,
    /// Open a short position.
    Sell,
    /// Do nothing.
    #[default]
    Hold,
}

/// Signal-producing contract consumed by the simulation engine.
///
/// Implementations must be deterministic: the same series always yields the same signals.
pub trait Strategy: Send + Sync {
    /// Returns the strategy name (e.g. `"mean_reversion"`).
    fn name(&self) -> &str;

    /// Returns the validated parameters the strategy was built with.
    fn parameters(&self) -> Parameters;

    /// Returns the number of observations needed before any signal can fire.
    fn min_history(&self) -> usize;

    /// Returns the fraction of current capital committed per trade, in `(0, 1]`.
    fn position_size(&self) -> Decimal;

    /// Generates exactly one signal per observation of `series`.
    ///
    /// Observations without enough history are always [`Signal::Hold`].
    fn generate_signals(&self, series: &PriceSeries) -> Vec<Signal>;

    /// Strategy-specific exit rule for an open `position` at `index`.
    fn exit_signal(&self, _series: &PriceSeries, _index: usize, _position: &Position) -> bool {
        false
    }
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn parameters(&self) -> Parameters {
        (**self).parameters()
    }

    fn min_history(&self) -> usize {
        (**self).min_history()
    }

    fn position_size(&self) -> Decimal {
        (**self).position_size()
    }

    fn generate_signals(&self, series: &PriceSeries) -> Vec<Signal> {
        (**self).generate_signals(series)
    }

    fn exit_signal(&self, series: &PriceSeries, index: usize, position: &Position) -> bool {
        (**self).exit_signal(series, index, position)
    }
}

/// Built-in strategy variants, addressable by name.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// See [`MeanReversion`].
    MeanReversion,
    /// See [`Momentum`].
    Momentum,
    /// See [`LongFavorite`].
    LongFavorite,
    /// See [`FadeOverreaction`].
    FadeOverreaction,
}

impl StrategyKind {
    /// All built-in variants.
    pub const ALL: [Self; 4] = [
        Self::MeanReversion,
        Self::Momentum,
        Self::LongFavorite,
        Self::FadeOverreaction,
    ];

    /// Returns the snake_case name of the variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MeanReversion => "mean_reversion",
            Self::Momentum => "momentum",
            Self::LongFavorite => "long_favorite",
            Self::FadeOverreaction => "fade_overreaction",
        }
    }

    /// Validates `params` and builds the matching strategy.
    pub fn build(&self, params: &Parameters) -> Result<Box<dyn Strategy>> {
        Ok(match self {
            Self::MeanReversion => Box::new(MeanReversion::from_params(params)?),
            Self::Momentum => Box::new(Momentum::from_params(params)?),
            Self::LongFavorite => Box::new(LongFavorite::from_params(params)?),
            Self::FadeOverreaction => Box::new(FadeOverreaction::from_params(params)?),
        })
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownStrategy(s.to_string()))
    }
}

pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Error {
    Error::InvalidParameter {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Reads and validates `position_size` from `params`.
pub(crate) fn position_size_param(params: &Parameters) -> Result<Decimal> {
    let value = params.float_or("position_size", DEFAULT_POSITION_SIZE)?;
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid("position_size", format!("must be in (0, 1], got {value}")));
    }
    // shortest decimal form of the float, so 0.1 stays exactly 0.1
    value
        .to_string()
        .parse::<Decimal>()
        .map_err(|e| invalid("position_size", e.to_string()))
}

/// Converts a validated `position_size` back to a parameter value.
pub(crate) fn position_size_value(position_size: Decimal) -> f64 {
    crate::utils::to_f64(position_size)
}
