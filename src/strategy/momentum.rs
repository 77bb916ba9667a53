use rust_decimal::Decimal;

use super::{Parameters, Signal, Strategy, invalid, position_size_param, position_size_value};
use crate::engine::PriceSeries;
use crate::errors::Result;

/// Trend following on the YES probability.
///
/// Buys when the probability rose by more than `threshold` over the last `lookback`
/// observations, sells when it fell by more than `threshold`. Positions are closed by an
/// opposite signal or at the end of the series.
#[derive(Debug, Clone, PartialEq)]
pub struct Momentum {
    lookback: usize,
    threshold: f64,
    position_size: Decimal,
}

impl Momentum {
    /// Strategy name.
    pub const NAME: &'static str = "momentum";

    /// Validates `params` (`lookback` >= 1, default 5; `threshold` > 0, default 0.05;
    /// `position_size`) and builds the strategy.
    pub fn from_params(params: &Parameters) -> Result<Self> {
        let lookback = params.int_or("lookback", 5)?;
        if lookback < 1 {
            return Err(invalid("lookback", format!("must be >= 1, got {lookback}")));
        }

        let threshold = params.float_or("threshold", 0.05)?;
        if !(threshold > 0.0 && threshold.is_finite()) {
            return Err(invalid("threshold", format!("must be > 0, got {threshold}")));
        }

        Ok(Self {
            lookback: lookback as usize,
            threshold,
            position_size: position_size_param(params)?,
        })
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> Parameters {
        Parameters::new()
            .with("lookback", self.lookback as i64)
            .with("threshold", self.threshold)
            .with("position_size", position_size_value(self.position_size))
    }

    fn min_history(&self) -> usize {
        self.lookback + 1
    }

    fn position_size(&self) -> Decimal {
        self.position_size
    }

    fn generate_signals(&self, series: &PriceSeries) -> Vec<Signal> {
        let prices = series.probabilities();
        (0..prices.len())
            .map(|i| {
                if i < self.lookback {
                    return Signal::Hold;
                }
                let change = prices[i] - prices[i - self.lookback];
                if change > self.threshold {
                    Signal::Buy
                } else if change < -self.threshold {
                    Signal::Sell
                } else {
                    Signal::Hold
                }
            })
            .collect()
    }
}
