use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// One price snapshot of a binary-outcome market.
///
/// Prices are expressed in cents, within `[0, 100]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawObservation"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceObservation {
    timestamp: DateTime<Utc>,
    yes_price: Decimal,
    no_price: Decimal,
    volume: u64,
}

impl PriceObservation {
    /// Creates a new observation, rejecting prices outside `[0, 100]`.
    pub fn new(timestamp: DateTime<Utc>, yes_price: Decimal, no_price: Decimal, volume: u64) -> Result<Self> {
        for price in [yes_price, no_price] {
            if price < Decimal::ZERO || price > Decimal::ONE_HUNDRED {
                return Err(Error::PriceOutOfRange(price));
            }
        }

        Ok(Self {
            timestamp,
            yes_price,
            no_price,
            volume,
        })
    }

    /// Returns the observation time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the YES price in cents.
    pub fn yes_price(&self) -> Decimal {
        self.yes_price
    }

    /// Returns the NO price in cents.
    pub fn no_price(&self) -> Decimal {
        self.no_price
    }

    /// Returns the traded volume.
    pub fn volume(&self) -> u64 {
        self.volume
    }

    /// Returns the YES price as a probability in `[0, 1]`.
    pub fn probability(&self) -> f64 {
        (self.yes_price / Decimal::ONE_HUNDRED).to_f64().unwrap_or_default()
    }
}

/// Time-ordered observations of a single instrument.
///
/// Timestamps are strictly increasing. The series is immutable once built.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawSeries"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSeries {
    ticker: String,
    observations: Vec<PriceObservation>,
}

// Deserialized fields, checked by the constructors before use.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawObservation {
    timestamp: DateTime<Utc>,
    yes_price: Decimal,
    no_price: Decimal,
    volume: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawObservation> for PriceObservation {
    type Error = Error;

    fn try_from(raw: RawObservation) -> Result<Self> {
        Self::new(raw.timestamp, raw.yes_price, raw.no_price, raw.volume)
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawSeries {
    ticker: String,
    observations: Vec<PriceObservation>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawSeries> for PriceSeries {
    type Error = Error;

    fn try_from(raw: RawSeries) -> Result<Self> {
        Self::new(raw.ticker, raw.observations)
    }
}

impl PriceSeries {
    /// Creates a new series.
    ///
    /// ### Arguments
    /// * `ticker` - Market ticker (e.g. `"INXD-24FEB16-T4125"`).
    /// * `observations` - Observations sorted by timestamp, without duplicates.
    ///
    /// ### Returns
    /// The series, or `UnorderedTimestamps` if two consecutive timestamps do not increase.
    pub fn new(ticker: impl Into<String>, observations: Vec<PriceObservation>) -> Result<Self> {
        if let Some(pair) = observations.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(Error::UnorderedTimestamps(pair[0].timestamp, pair[1].timestamp));
        }

        Ok(Self {
            ticker: ticker.into(),
            observations,
        })
    }

    /// Returns the ticker.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Returns the number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Returns true if the series holds no observation.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Returns the observation at `index`.
    pub fn get(&self, index: usize) -> Option<&PriceObservation> {
        self.observations.get(index)
    }

    /// Returns the first observation.
    pub fn first(&self) -> Option<&PriceObservation> {
        self.observations.first()
    }

    /// Returns the last observation.
    pub fn last(&self) -> Option<&PriceObservation> {
        self.observations.last()
    }

    /// Returns an iterator over the observations.
    pub fn iter(&self) -> std::slice::Iter<'_, PriceObservation> {
        self.observations.iter()
    }

    /// Returns the observations as a slice.
    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    /// Returns the YES probabilities, one per observation.
    pub fn probabilities(&self) -> Vec<f64> {
        self.observations.iter().map(PriceObservation::probability).collect()
    }

    /// Returns the sub-series whose timestamps fall within `[start, end]`.
    ///
    /// Missing bounds are open.
    pub fn between(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<Self> {
        if let (Some(start), Some(end)) = (start, end)
            && end <= start
        {
            return Err(Error::InvalidDateRange(start, end));
        }

        let observations = self
            .observations
            .iter()
            .filter(|o| start.is_none_or(|s| o.timestamp >= s) && end.is_none_or(|e| o.timestamp <= e))
            .copied()
            .collect();

        Ok(Self {
            ticker: self.ticker.clone(),
            observations,
        })
    }
}

/// Caller-owned cache of loaded series, keyed by ticker.
///
/// Iteration is in lexicographic ticker order. Cloning is cheap: series are shared.
#[derive(Debug, Clone, Default)]
pub struct SeriesCache {
    series: BTreeMap<String, Arc<PriceSeries>>,
}

impl FromIterator<PriceSeries> for SeriesCache {
    fn from_iter<T: IntoIterator<Item = PriceSeries>>(iter: T) -> Self {
        let mut cache = Self::default();
        for series in iter {
            cache.insert(series);
        }
        cache
    }
}

impl SeriesCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a series, replacing any previous one for the same ticker.
    pub fn insert(&mut self, series: PriceSeries) -> Option<Arc<PriceSeries>> {
        self.series.insert(series.ticker.clone(), Arc::new(series))
    }

    /// Returns the series loaded for `ticker`.
    pub fn get(&self, ticker: &str) -> Result<Arc<PriceSeries>> {
        self.series
            .get(ticker)
            .cloned()
            .ok_or_else(|| Error::UnknownTicker(ticker.to_string()))
    }

    /// Returns the number of cached series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Returns the cached tickers in lexicographic order.
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Returns the cached series in lexicographic ticker order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PriceSeries>> {
        self.series.values()
    }

    /// Returns a cache restricted to the tickers starting with `prefix`.
    pub fn filter(&self, prefix: &str) -> Self {
        let series = self
            .series
            .iter()
            .filter(|(ticker, _)| ticker.starts_with(prefix))
            .map(|(ticker, series)| (ticker.clone(), Arc::clone(series)))
            .collect();
        Self { series }
    }
}
