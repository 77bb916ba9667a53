use rust_decimal::Decimal;

use super::{Parameters, Signal, Strategy, invalid, position_size_param, position_size_value};
use crate::engine::{Position, PositionSide, PriceSeries};
use crate::errors::Result;
use crate::utils::mean;

/// Fades sharp moves of the YES probability.
///
/// - **Sell** when the probability jumped up by more than `spike_threshold` compared to
///   `window` observations earlier.
/// - **Buy** when it dropped by more than `spike_threshold`.
///
/// The trade is closed once the price retraces to the mean of the `window` observations
/// that preceded the entry.
///
/// ### Parameters
/// | Name | Default | Constraint |
/// |------|---------|------------|
/// | `window` | 3 | integer >= 1 |
/// | `spike_threshold` | 0.1 | (0, 1) |
/// | `position_size` | 0.1 | (0, 1] |
#[derive(Debug, Clone, PartialEq)]
pub struct FadeOverreaction {
    window: usize,
    spike_threshold: f64,
    position_size: Decimal,
}

impl FadeOverreaction {
    /// Strategy name.
    pub const NAME: &'static str = "fade_overreaction";

    /// Validates `params` and builds the strategy.
    pub fn from_params(params: &Parameters) -> Result<Self> {
        let window = params.int_or("window", 3)?;
        if window < 1 {
            return Err(invalid("window", format!("must be >= 1, got {window}")));
        }

        let spike_threshold = params.float_or("spike_threshold", 0.1)?;
        if !(spike_threshold > 0.0 && spike_threshold < 1.0) {
            return Err(invalid(
                "spike_threshold",
                format!("must be in (0, 1), got {spike_threshold}"),
            ));
        }

        Ok(Self {
            window: window as usize,
            spike_threshold,
            position_size: position_size_param(params)?,
        })
    }

    /// Mean probability of the `window` observations before `index`.
    fn pre_spike_mean(&self, series: &PriceSeries, index: usize) -> Option<f64> {
        let start = index.checked_sub(self.window)?;
        let window = series.observations().get(start..index)?;
        let prices: Vec<f64> = window.iter().map(|o| o.probability()).collect();
        mean(&prices)
    }
}

impl Strategy for FadeOverreaction {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> Parameters {
        Parameters::new()
            .with("window", self.window as i64)
            .with("spike_threshold", self.spike_threshold)
            .with("position_size", position_size_value(self.position_size))
    }

    fn min_history(&self) -> usize {
        self.window + 1
    }

    fn position_size(&self) -> Decimal {
        self.position_size
    }

    fn generate_signals(&self, series: &PriceSeries) -> Vec<Signal> {
        let prices = series.probabilities();
        (0..prices.len())
            .map(|i| match i.checked_sub(self.window) {
                Some(j) if prices[i] - prices[j] > self.spike_threshold => Signal::Sell,
                Some(j) if prices[j] - prices[i] > self.spike_threshold => Signal::Buy,
                _ => Signal::Hold,
            })
            .collect()
    }

    fn exit_signal(&self, series: &PriceSeries, index: usize, position: &Position) -> bool {
        let (Some(target), Some(current)) = (
            self.pre_spike_mean(series, position.entry_index()),
            series.get(index).map(|o| o.probability()),
        ) else {
            return false;
        };
        match position.side() {
            PositionSide::Long => current >= target,
            PositionSide::Short => current <= target,
        }
    }
}
