use rust_decimal::Decimal;

use super::{Parameters, Signal, Strategy, invalid, position_size_param, position_size_value};
use crate::engine::{Position, PriceSeries};
use crate::errors::Result;
use crate::utils::{EPSILON, rolling_mean_std};

/// Probability of the neutral level of a binary market.
pub(crate) const NEUTRAL: f64 = 0.5;

/// Mean-reversion on the YES probability.
///
/// Over a rolling `window` (current observation included):
/// - **Buy** when `price < mean - std_threshold * std`.
/// - **Sell** when `price > mean + std_threshold * std`.
/// - **Hold** otherwise, and for the first `window - 1` observations.
///
/// With `exit_neutral`, an open position is closed once the price is within
/// `neutral_threshold` of 0.50.
///
/// ### Parameters
/// | Name | Default | Constraint |
/// |------|---------|------------|
/// | `window` | 20 | integer >= 2 |
/// | `std_threshold` | 1.5 | > 0 |
/// | `position_size` | 0.1 | (0, 1] |
/// | `neutral_threshold` | 0.02 | [0, 0.5) |
/// | `exit_neutral` | true | bool |
#[derive(Debug, Clone, PartialEq)]
pub struct MeanReversion {
    window: usize,
    std_threshold: f64,
    position_size: Decimal,
    neutral_threshold: f64,
    exit_neutral: bool,
}

impl MeanReversion {
    /// Strategy name.
    pub const NAME: &'static str = "mean_reversion";

    /// Validates `params` and builds the strategy. Missing parameters take their defaults.
    pub fn from_params(params: &Parameters) -> Result<Self> {
        let window = params.int_or("window", 20)?;
        if window < 2 {
            return Err(invalid("window", format!("must be >= 2, got {window}")));
        }

        let std_threshold = params.float_or("std_threshold", 1.5)?;
        if !(std_threshold > 0.0 && std_threshold.is_finite()) {
            return Err(invalid("std_threshold", format!("must be > 0, got {std_threshold}")));
        }

        let neutral_threshold = params.float_or("neutral_threshold", 0.02)?;
        if !(0.0..NEUTRAL).contains(&neutral_threshold) {
            return Err(invalid(
                "neutral_threshold",
                format!("must be in [0, 0.5), got {neutral_threshold}"),
            ));
        }

        Ok(Self {
            window: window as usize,
            std_threshold,
            position_size: position_size_param(params)?,
            neutral_threshold,
            exit_neutral: params.bool_or("exit_neutral", true)?,
        })
    }

    /// Returns the rolling window length.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Returns the band width in standard deviations.
    pub fn std_threshold(&self) -> f64 {
        self.std_threshold
    }
}

impl Strategy for MeanReversion {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> Parameters {
        Parameters::new()
            .with("window", self.window as i64)
            .with("std_threshold", self.std_threshold)
            .with("position_size", position_size_value(self.position_size))
            .with("neutral_threshold", self.neutral_threshold)
            .with("exit_neutral", self.exit_neutral)
    }

    fn min_history(&self) -> usize {
        self.window
    }

    fn position_size(&self) -> Decimal {
        self.position_size
    }

    fn generate_signals(&self, series: &PriceSeries) -> Vec<Signal> {
        let prices = series.probabilities();
        rolling_mean_std(&prices, self.window)
            .into_iter()
            .zip(prices.iter())
            .map(|(stats, &price)| match stats {
                // a flat window has no band: never trade on it
                Some((_, std)) if std <= EPSILON => Signal::Hold,
                Some((mean, std)) if price < mean - self.std_threshold * std => Signal::Buy,
                Some((mean, std)) if price > mean + self.std_threshold * std => Signal::Sell,
                _ => Signal::Hold,
            })
            .collect()
    }

    fn exit_signal(&self, series: &PriceSeries, index: usize, _position: &Position) -> bool {
        self.exit_neutral
            && series
                .get(index)
                .is_some_and(|o| (o.probability() - NEUTRAL).abs() < self.neutral_threshold)
    }
}
