//! Ad-hoc backtest requests.
//!
//! A [`BacktestRequest`] is the configuration surface of a single evaluation: a strategy
//! name, an optional date range, an optional ticker filter and a free-form parameter map.
//! [`evaluate`] resolves it against a [`SeriesCache`] and runs
//! Strategy -> Backtest -> Metrics, without the optimizer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{Backtest, BacktestConfig, BacktestResult, SeriesCache};
use crate::errors::{Error, Result};
use crate::metrics::{MetricsConfig, MetricsReport};
use crate::strategy::{Parameters, StrategyKind};

/// Everything needed to run one backtest.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRequest {
    /// The strategy to run.
    pub strategy: StrategyKind,
    /// First timestamp included, if any.
    pub start: Option<DateTime<Utc>>,
    /// Last timestamp included, if any.
    pub end: Option<DateTime<Utc>>,
    /// Ticker prefix. Without it every cached series is used.
    pub ticker_filter: Option<String>,
    /// Strategy parameters, validated by the strategy itself.
    #[cfg_attr(feature = "serde", serde(default))]
    pub parameters: Parameters,
    /// Overrides the configured initial capital.
    pub initial_capital: Option<Decimal>,
}

impl BacktestRequest {
    /// Creates a request for `strategy` over every cached series, with default parameters.
    pub fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            start: None,
            end: None,
            ticker_filter: None,
            parameters: Parameters::new(),
            initial_capital: None,
        }
    }

    /// Restricts the request to an inclusive date range.
    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Restricts the request to tickers starting with `prefix`.
    pub fn ticker_filter(mut self, prefix: impl Into<String>) -> Self {
        self.ticker_filter = Some(prefix.into());
        self
    }

    /// Sets the strategy parameters.
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Sets the initial capital.
    pub fn initial_capital(mut self, capital: Decimal) -> Self {
        self.initial_capital = Some(capital);
        self
    }

    /// Checks the date range and the capital.
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start, self.end)
            && end <= start
        {
            return Err(Error::InvalidDateRange(start, end));
        }
        match self.initial_capital {
            Some(capital) if capital <= Decimal::ZERO => Err(Error::NegZeroCapital(capital)),
            _ => Ok(()),
        }
    }

    /// Returns the label of the ticker selection.
    pub fn label(&self) -> &str {
        self.ticker_filter.as_deref().unwrap_or("*")
    }
}

/// Runs a request against the cached series.
///
/// The strategy parameters and the request are validated before any simulation. When the
/// filter selects a single ticker the series is run on its own, otherwise every selected
/// ticker runs in multi-ticker mode.
///
/// ### Arguments
/// * `request` - What to run.
/// * `cache` - The loaded series.
/// * `config` - Backtest settings; the request may override the initial capital.
/// * `metrics` - Settings of the return-based ratios.
///
/// ### Returns
/// The backtest result and its metrics, or an error if validation failed or no series matched.
pub fn evaluate(
    request: &BacktestRequest,
    cache: &SeriesCache,
    config: &BacktestConfig,
    metrics: &MetricsConfig,
) -> Result<(BacktestResult, MetricsReport)> {
    request.validate()?;
    metrics.validate()?;
    let strategy = request.strategy.build(&request.parameters)?;

    let config = BacktestConfig {
        initial_capital: request.initial_capital.unwrap_or(config.initial_capital),
        ..*config
    };
    let backtest = Backtest::new(config)?;

    let selected = match &request.ticker_filter {
        Some(prefix) => cache.filter(prefix),
        None => cache.clone(),
    };
    if selected.is_empty() {
        return Err(Error::NoMatchingSeries(request.label().to_string()));
    }

    let mut ranged = SeriesCache::new();
    for series in selected.iter() {
        ranged.insert(series.between(request.start, request.end)?);
    }

    tracing::debug!(
        strategy = %request.strategy,
        label = %request.label(),
        tickers = ranged.len(),
        "Evaluating request"
    );

    let result = match ranged.iter().next() {
        Some(series) if ranged.len() == 1 => backtest.run(series, &strategy)?,
        _ => backtest.run_multi_ticker(&ranged, &strategy, request.label())?,
    };
    let report = MetricsReport::new(&result, metrics);
    Ok((result, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::engine::{PriceObservation, PriceSeries};
    use crate::strategy::Strategy;

    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn series(ticker: &str, prices: &[i64]) -> PriceSeries {
        let observations = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let yes = Decimal::from(p);
                PriceObservation::new(start() + Duration::days(i as i64), yes, dec!(100) - yes, 3).unwrap()
            })
            .collect();
        PriceSeries::new(ticker, observations).unwrap()
    }

    fn cache() -> SeriesCache {
        [
            series("KXFED-25", &[50, 50, 50, 50, 50, 30, 50, 50, 50, 50]),
            series("KXFED-26", &[50, 50, 50, 50, 50, 70, 50, 50]),
            series("KXCPI-25", &[40, 41, 42]),
        ]
        .into_iter()
        .collect()
    }

    fn params() -> Parameters {
        Parameters::new().with("window", 5_i64).with("std_threshold", 1.0)
    }

    #[test]
    fn single_ticker_request() {
        let request = BacktestRequest::new(StrategyKind::MeanReversion)
            .ticker_filter("KXFED-25")
            .parameters(params());
        let (result, report) =
            evaluate(&request, &cache(), &BacktestConfig::default(), &MetricsConfig::default()).unwrap();

        assert_eq!(result.label, "KXFED-25");
        assert_eq!(result.executions.len(), 1);
        assert_eq!(report.total_trades, 1);
        assert_eq!(report.total_pnl, dec!(660));
        assert_eq!(report.sharpe_ratio, None);
    }

    #[test]
    fn filter_runs_multi_ticker() {
        let request = BacktestRequest::new(StrategyKind::MeanReversion)
            .ticker_filter("KXFED")
            .parameters(params())
            .initial_capital(dec!(1000));
        let (result, report) =
            evaluate(&request, &cache(), &BacktestConfig::default(), &MetricsConfig::default()).unwrap();

        assert_eq!(result.label, "KXFED");
        assert_eq!(result.initial_capital, dec!(1000));
        assert_eq!(report.total_trades, 2);
        assert!(result.executions.iter().all(|e| e.ticker.starts_with("KXFED")));
        // long on KXFED-25 wins, short on KXFED-26 wins too
        assert_eq!(report.losing_trades, 0);
        assert_eq!(report.profit_factor, None);
    }

    #[test]
    fn date_range_limits_the_series() {
        let request = BacktestRequest::new(StrategyKind::MeanReversion)
            .ticker_filter("KXFED-25")
            .parameters(params())
            .between(None, Some(start() + Duration::days(4)));
        let (result, _) = evaluate(&request, &cache(), &BacktestConfig::default(), &MetricsConfig::default()).unwrap();
        assert!(result.executions.is_empty());
    }

    #[test]
    fn invalid_requests() {
        let config = BacktestConfig::default();
        let metrics = MetricsConfig::default();

        let request = BacktestRequest::new(StrategyKind::MeanReversion).between(Some(start()), Some(start()));
        assert_eq!(
            evaluate(&request, &cache(), &config, &metrics).unwrap_err(),
            Error::InvalidDateRange(start(), start())
        );

        let request = BacktestRequest::new(StrategyKind::MeanReversion).initial_capital(dec!(-5));
        assert_eq!(
            evaluate(&request, &cache(), &config, &metrics).unwrap_err(),
            Error::NegZeroCapital(dec!(-5))
        );

        let request = BacktestRequest::new(StrategyKind::MeanReversion).parameters(Parameters::new().with("window", 0_i64));
        assert!(matches!(
            evaluate(&request, &cache(), &config, &metrics),
            Err(Error::InvalidParameter { .. })
        ));

        let request = BacktestRequest::new(StrategyKind::Momentum).ticker_filter("KXGDP");
        assert_eq!(
            evaluate(&request, &cache(), &config, &metrics).unwrap_err(),
            Error::NoMatchingSeries("KXGDP".into())
        );
    }

    #[test]
    fn request_matches_direct_run() {
        let request = BacktestRequest::new(StrategyKind::Momentum).ticker_filter("KXCPI");
        let (result, _) = evaluate(&request, &cache(), &BacktestConfig::default(), &MetricsConfig::default()).unwrap();

        let strategy = StrategyKind::Momentum.build(&Parameters::new()).unwrap();
        let direct = Backtest::new(BacktestConfig::default())
            .unwrap()
            .run(&series("KXCPI-25", &[40, 41, 42]), &strategy)
            .unwrap();
        assert_eq!(result, direct);
        assert_eq!(result.strategy_name, strategy.name());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn request_from_json() {
        let json = r#"{
            "strategy": "fade_overreaction",
            "start": null,
            "end": null,
            "ticker_filter": "KXFED",
            "parameters": {"window": 2, "spike_threshold": 0.15},
            "initial_capital": "2500"
        }"#;
        let request: BacktestRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.strategy, StrategyKind::FadeOverreaction);
        assert_eq!(request.initial_capital, Some(dec!(2500)));
        assert!(request.strategy.build(&request.parameters).is_ok());
    }
}
