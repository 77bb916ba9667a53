use rust_decimal::Decimal;

use super::mean_reversion::NEUTRAL;
use super::{Parameters, Signal, Strategy, invalid, position_size_param, position_size_value};
use crate::engine::{Position, PositionSide, PriceSeries};
use crate::errors::Result;

/// Backs whichever side the market already favours.
///
/// - **Buy** when `favorite_threshold <= p <= max_price`.
/// - **Sell** when `p <= 1 - favorite_threshold`.
///
/// A position is closed once the favourite loses its status, that is when the
/// probability crosses back through 0.50 against it.
///
/// ### Parameters
/// | Name | Default | Constraint |
/// |------|---------|------------|
/// | `favorite_threshold` | 0.7 | (0.5, 1) |
/// | `max_price` | none | (favorite_threshold, 1] |
/// | `position_size` | 0.1 | (0, 1] |
#[derive(Debug, Clone, PartialEq)]
pub struct LongFavorite {
    favorite_threshold: f64,
    max_price: Option<f64>,
    position_size: Decimal,
}

impl LongFavorite {
    /// Strategy name.
    pub const NAME: &'static str = "long_favorite";

    /// Validates `params` and builds the strategy.
    pub fn from_params(params: &Parameters) -> Result<Self> {
        let favorite_threshold = params.float_or("favorite_threshold", 0.7)?;
        if !(favorite_threshold > NEUTRAL && favorite_threshold < 1.0) {
            return Err(invalid(
                "favorite_threshold",
                format!("must be in (0.5, 1), got {favorite_threshold}"),
            ));
        }

        let max_price = params.float_opt("max_price")?;
        if let Some(max) = max_price.filter(|max| !(*max > favorite_threshold && *max <= 1.0)) {
            return Err(invalid(
                "max_price",
                format!("must be in ({favorite_threshold}, 1], got {max}"),
            ));
        }

        Ok(Self {
            favorite_threshold,
            max_price,
            position_size: position_size_param(params)?,
        })
    }
}

impl Strategy for LongFavorite {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn parameters(&self) -> Parameters {
        let params = Parameters::new()
            .with("favorite_threshold", self.favorite_threshold)
            .with("position_size", position_size_value(self.position_size));
        match self.max_price {
            Some(max) => params.with("max_price", max),
            None => params,
        }
    }

    fn min_history(&self) -> usize {
        1
    }

    fn position_size(&self) -> Decimal {
        self.position_size
    }

    fn generate_signals(&self, series: &PriceSeries) -> Vec<Signal> {
        let max_price = self.max_price.unwrap_or(1.0);
        series
            .iter()
            .map(|o| {
                let p = o.probability();
                if p >= self.favorite_threshold && p <= max_price {
                    Signal::Buy
                } else if p <= 1.0 - self.favorite_threshold {
                    Signal::Sell
                } else {
                    Signal::Hold
                }
            })
            .collect()
    }

    fn exit_signal(&self, series: &PriceSeries, index: usize, position: &Position) -> bool {
        let Some(p) = series.get(index).map(|o| o.probability()) else {
            return false;
        };
        match position.side() {
            PositionSide::Long => p < NEUTRAL,
            PositionSide::Short => p > NEUTRAL,
        }
    }
}
