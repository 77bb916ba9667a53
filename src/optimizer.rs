//! Strategy parameter optimization.
//!
//! This module provides tools to optimize trading strategies by testing every combination of
//! a [`ParameterGrid`]. The `Optimizer` builds one strategy per combination, runs it through
//! a [`Backtest`], scores it with a [`MetricsReport`] and ranks the runs by an
//! [`ObjectiveMetric`].
//!
//! Cells are evaluated in parallel and re-sorted at the end, so the ranking never depends on
//! the evaluation order nor on the order of the grid.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{Backtest, BacktestConfig, BacktestResult, PriceSeries, SeriesCache};
use crate::errors::{Error, Result};
use crate::metrics::{MetricsConfig, MetricsReport, ObjectiveMetric};
use crate::strategy::{ParameterGrid, Parameters, Strategy, StrategyKind};

/// Evaluated parameter set.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRun {
    /// The parameters the strategy was built with.
    pub parameters: Parameters,
    /// Statistics of the run.
    pub metrics: MetricsReport,
}

/// Parameter set rejected by the strategy validation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCombination {
    /// The rejected parameters.
    pub parameters: Parameters,
    /// Why they were rejected.
    pub reason: String,
}

/// Outcome of a grid search.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationReport {
    /// Metric the runs are ranked by.
    pub objective: ObjectiveMetric,
    /// Runs from best to worst.
    pub ranked: Vec<RankedRun>,
    /// Combinations that failed validation.
    pub skipped: Vec<SkippedCombination>,
    /// True if the search was stopped before every cell was evaluated.
    pub cancelled: bool,
}

impl OptimizationReport {
    /// Returns the best run, if any.
    pub fn best(&self) -> Option<&RankedRun> {
        self.ranked.first()
    }

    /// Returns the runs whose objective is strictly above `threshold`, best first.
    pub fn satisfying(&self, threshold: f64) -> impl Iterator<Item = &RankedRun> + '_ {
        self.ranked
            .iter()
            .filter(move |run| run.metrics.meets(self.objective, threshold))
    }
}

#[derive(Debug, Clone)]
enum Source {
    Series(PriceSeries),
    Cache { cache: SeriesCache, label: String },
}

enum Cell {
    Ranked(usize, RankedRun),
    Skipped(usize, SkippedCombination),
}

/// Grid search over strategy parameters.
#[derive(Debug, Clone)]
pub struct Optimizer {
    source: Source,
    backtest: Backtest,
    metrics: MetricsConfig,
    threads: Option<usize>,
}

impl Optimizer {
    /// Creates an optimizer over one series.
    ///
    /// ### Arguments
    /// * `series` - Price history the strategies are run against.
    /// * `config` - Backtest settings shared by every run.
    /// * `metrics` - Settings of the return-based ratios.
    ///
    /// ### Returns
    /// The new optimizer, or an error if a config is invalid.
    pub fn new(series: PriceSeries, config: BacktestConfig, metrics: MetricsConfig) -> Result<Self> {
        metrics.validate()?;
        Ok(Self {
            source: Source::Series(series),
            backtest: Backtest::new(config)?,
            metrics,
            threads: None,
        })
    }

    /// Creates an optimizer running every strategy in multi-ticker mode over `cache`.
    ///
    /// ### Arguments
    /// * `cache` - The series to simulate, keyed by ticker.
    /// * `label` - Name of the ticker selection reported in the results.
    /// * `config` - Backtest settings shared by every run.
    /// * `metrics` - Settings of the return-based ratios.
    pub fn multi_ticker(
        cache: SeriesCache,
        label: impl Into<String>,
        config: BacktestConfig,
        metrics: MetricsConfig,
    ) -> Result<Self> {
        metrics.validate()?;
        Ok(Self {
            source: Source::Cache {
                cache,
                label: label.into(),
            },
            backtest: Backtest::new(config)?,
            metrics,
            threads: None,
        })
    }

    /// Runs the search on a dedicated pool of `threads` workers instead of the global one.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    /// Optimizes a built-in strategy.
    pub fn optimize_kind(
        &self,
        kind: StrategyKind,
        grid: &ParameterGrid,
        objective: ObjectiveMetric,
    ) -> Result<OptimizationReport> {
        self.optimize(|params| kind.build(params), grid, objective)
    }

    /// Optimizes a strategy by testing every combination of `grid`.
    ///
    /// ### Arguments
    /// * `factory` - Validates a parameter set and builds the strategy. Combinations it
    ///   rejects are skipped and recorded.
    /// * `grid` - The parameter space.
    /// * `objective` - The metric runs are ranked by, undefined values last.
    ///
    /// ### Returns
    /// The ranked runs, or an error if the grid is empty or a run broke an invariant.
    pub fn optimize<S, F>(&self, factory: F, grid: &ParameterGrid, objective: ObjectiveMetric) -> Result<OptimizationReport>
    where
        S: Strategy,
        F: Fn(&Parameters) -> Result<S> + Sync,
    {
        self.optimize_until(factory, grid, objective, &AtomicBool::new(false))
    }

    /// Same as [`Optimizer::optimize`], checking `stop` before each cell.
    ///
    /// Once `stop` is set, the remaining cells are not evaluated and the report is marked
    /// as cancelled. Runs already evaluated are still ranked.
    pub fn optimize_until<S, F>(
        &self,
        factory: F,
        grid: &ParameterGrid,
        objective: ObjectiveMetric,
        stop: &AtomicBool,
    ) -> Result<OptimizationReport>
    where
        S: Strategy,
        F: Fn(&Parameters) -> Result<S> + Sync,
    {
        let combinations = grid.combinations();
        if combinations.is_empty() {
            return Err(Error::EmptyGrid);
        }

        let cells = match self.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| Error::ThreadPool(e.to_string()))?
                .install(|| self.evaluate_all(&factory, &combinations, threads, stop))?,
            None => self.evaluate_all(&factory, &combinations, num_cpus::get(), stop)?,
        };

        let total = combinations.len();
        let mut ranked = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        for cell in cells {
            match cell {
                Cell::Ranked(index, run) => ranked.push((index, run)),
                Cell::Skipped(index, skip) => skipped.push((index, skip)),
            }
        }

        ranked.sort_by(|(ia, a), (ib, b)| {
            compare_objective(objective.value(&a.metrics), objective.value(&b.metrics))
                .then_with(|| b.metrics.total_trades.cmp(&a.metrics.total_trades))
                .then_with(|| a.parameters.cmp(&b.parameters))
                .then_with(|| ia.cmp(ib))
        });
        skipped.sort_by(|(ia, a), (ib, b)| a.parameters.cmp(&b.parameters).then_with(|| ia.cmp(ib)));

        let cancelled = ranked.len() + skipped.len() < total;
        if cancelled {
            tracing::warn!(
                evaluated = ranked.len() + skipped.len(),
                total,
                "Optimization stopped before the end of the grid"
            );
        }
        tracing::info!(
            %objective,
            ranked = ranked.len(),
            skipped = skipped.len(),
            total,
            "Optimization finished"
        );

        Ok(OptimizationReport {
            objective,
            ranked: ranked.into_iter().map(|(_, run)| run).collect(),
            skipped: skipped.into_iter().map(|(_, skip)| skip).collect(),
            cancelled,
        })
    }

    fn evaluate_all<S, F>(
        &self,
        factory: &F,
        combinations: &[Parameters],
        workers: usize,
        stop: &AtomicBool,
    ) -> Result<Vec<Cell>>
    where
        S: Strategy,
        F: Fn(&Parameters) -> Result<S> + Sync,
    {
        let indexed: Vec<(usize, &Parameters)> = combinations.iter().enumerate().collect();
        let chunk_size = indexed.len().div_ceil(workers.max(1)).max(1);

        indexed
            .par_chunks(chunk_size)
            .map::<_, Result<_>>(|chunk| {
                let mut local = Vec::with_capacity(chunk.len());
                for &(index, params) in chunk {
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    local.push(self.evaluate(factory, index, params)?);
                }
                Ok(local)
            })
            .collect::<Result<Vec<_>>>()
            .map(|chunks| chunks.into_iter().flatten().collect())
    }

    fn evaluate<S, F>(&self, factory: &F, index: usize, params: &Parameters) -> Result<Cell>
    where
        S: Strategy,
        F: Fn(&Parameters) -> Result<S>,
    {
        let strategy = match factory(params) {
            Ok(strategy) => strategy,
            Err(e) => {
                tracing::debug!(parameters = %params, error = %e, "Skipping invalid combination");
                return Ok(Cell::Skipped(
                    index,
                    SkippedCombination {
                        parameters: params.clone(),
                        reason: e.to_string(),
                    },
                ));
            }
        };

        let result = self.run(&strategy)?;
        Ok(Cell::Ranked(
            index,
            RankedRun {
                parameters: params.clone(),
                metrics: MetricsReport::new(&result, &self.metrics),
            },
        ))
    }

    fn run<S: Strategy>(&self, strategy: &S) -> Result<BacktestResult> {
        match &self.source {
            Source::Series(series) => self.backtest.run(series, strategy),
            Source::Cache { cache, label } => self.backtest.run_multi_ticker(cache, strategy, label),
        }
    }
}

/// Descending order with undefined values last.
fn compare_objective(a: Option<f64>, b: Option<f64>) -> CmpOrdering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::engine::PriceObservation;
    use crate::strategy::{MeanReversion, ParamValue, Signal};

    use chrono::{DateTime, Duration};
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn random_walk(ticker: &str, seed: u64, len: usize) -> PriceSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut price: i64 = 50;
        let observations = (0..len)
            .map(|i| {
                price = (price + rng.random_range(-6..=6)).clamp(5, 95);
                let yes = Decimal::from(price);
                PriceObservation::new(start + Duration::hours(i as i64), yes, dec!(100) - yes, 10).unwrap()
            })
            .collect();
        PriceSeries::new(ticker, observations).unwrap()
    }

    fn optimizer() -> Optimizer {
        Optimizer::new(random_walk("KXOPT", 7, 300), BacktestConfig::default(), MetricsConfig::default()).unwrap()
    }

    fn grid() -> ParameterGrid {
        ParameterGrid::builder()
            .int("window", [1, 5, 10, 20])
            .float("std_threshold", [0.5, 1.0, 1.5])
            .float("position_size", [0.1, 0.3])
            .build()
    }

    #[test]
    fn rank_by_objective() {
        let report = optimizer()
            .optimize_kind(StrategyKind::MeanReversion, &grid(), ObjectiveMetric::TotalPnl)
            .unwrap();

        assert!(!report.cancelled);
        // window = 1 is invalid for every other axis value
        assert_eq!(report.skipped.len(), 6);
        assert!(report.skipped.iter().all(|s| s.parameters.get("window") == Some(&ParamValue::Int(1))));
        assert_eq!(report.ranked.len(), 18);

        let values: Vec<f64> = report
            .ranked
            .iter()
            .map(|run| ObjectiveMetric::TotalPnl.value(&run.metrics).unwrap())
            .collect();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(report.best(), report.ranked.first());
        assert!(report.satisfying(f64::MAX).next().is_none());
    }

    #[test]
    fn undefined_objective_ranks_last() {
        let report = optimizer()
            .optimize_kind(StrategyKind::MeanReversion, &grid(), ObjectiveMetric::SharpeRatio)
            .unwrap();
        let first_none = report.ranked.iter().position(|r| r.metrics.sharpe_ratio.is_none());
        if let Some(first_none) = first_none {
            assert!(report.ranked[first_none..].iter().all(|r| r.metrics.sharpe_ratio.is_none()));
        }
        let above: Vec<_> = report.satisfying(0.0).collect();
        assert!(above.iter().all(|r| r.metrics.sharpe_ratio.is_some_and(|s| s > 0.0)));
    }

    #[test]
    fn ranking_ignores_grid_order() {
        let mut rng = StdRng::seed_from_u64(99);
        let reference = optimizer()
            .optimize_kind(StrategyKind::MeanReversion, &grid(), ObjectiveMetric::SharpeRatio)
            .unwrap();

        for _ in 0..3 {
            let mut axes = grid().axes().to_vec();
            axes.shuffle(&mut rng);
            let mut builder = ParameterGrid::builder();
            for (name, mut values) in axes {
                values.shuffle(&mut rng);
                builder = builder.values(&name, values);
            }
            let shuffled = optimizer()
                .optimize_kind(StrategyKind::MeanReversion, &builder.build(), ObjectiveMetric::SharpeRatio)
                .unwrap();
            assert_eq!(shuffled, reference);
        }
    }

    #[test]
    fn full_size_compounding_completes() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut prices = vec![50, 50];
        for _ in 0..25 {
            prices.extend([1, 50, 50]);
        }
        let observations = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let yes = Decimal::from(p);
                PriceObservation::new(start + Duration::hours(i as i64), yes, dec!(100) - yes, 10).unwrap()
            })
            .collect();
        let series = PriceSeries::new("KXBOOM", observations).unwrap();
        let grid = ParameterGrid::builder()
            .int("window", [2])
            .float("std_threshold", [0.5])
            .float("position_size", [0.5, 1.0])
            .build();

        let report = Optimizer::new(series, BacktestConfig::default(), MetricsConfig::default())
            .unwrap()
            .optimize_kind(StrategyKind::MeanReversion, &grid, ObjectiveMetric::TotalPnl)
            .unwrap();
        assert_eq!(report.ranked.len(), 2);
        assert!(report.ranked.iter().all(|run| run.metrics.losing_trades == 0));
    }

    #[test]
    fn empty_grid() {
        let err = optimizer()
            .optimize_kind(StrategyKind::Momentum, &ParameterGrid::builder().build(), ObjectiveMetric::SharpeRatio)
            .unwrap_err();
        assert_eq!(err, Error::EmptyGrid);
    }

    #[test]
    fn stop_flag_cancels() {
        let stop = AtomicBool::new(true);
        let report = optimizer()
            .optimize_until(MeanReversion::from_params, &grid(), ObjectiveMetric::SharpeRatio, &stop)
            .unwrap();
        assert!(report.cancelled);
        assert!(report.ranked.is_empty());
    }

    #[test]
    fn invariant_errors_propagate() {
        struct Broken;

        impl Strategy for Broken {
            fn name(&self) -> &str {
                "broken"
            }

            fn parameters(&self) -> Parameters {
                Parameters::new()
            }

            fn min_history(&self) -> usize {
                1
            }

            fn position_size(&self) -> Decimal {
                Decimal::ONE
            }

            fn generate_signals(&self, _series: &PriceSeries) -> Vec<Signal> {
                vec![Signal::Buy]
            }
        }

        let err = optimizer()
            .optimize(|_| Ok(Broken), &grid(), ObjectiveMetric::TotalPnl)
            .unwrap_err();
        assert!(matches!(err, Error::SignalLength { .. }));
    }

    #[test]
    fn dedicated_pool_matches_global_pool() {
        let grid = ParameterGrid::builder()
            .int_range("lookback", 1, 6, 1)
            .float("threshold", [0.02, 0.05, 0.1])
            .build();
        let global = optimizer()
            .optimize_kind(StrategyKind::Momentum, &grid, ObjectiveMetric::CalmarRatio)
            .unwrap();
        let pooled = optimizer()
            .with_threads(2)
            .optimize_kind(StrategyKind::Momentum, &grid, ObjectiveMetric::CalmarRatio)
            .unwrap();
        assert_eq!(global, pooled);
        assert_eq!(global.ranked.len(), grid.total_combinations());
    }

    #[test]
    fn multi_ticker_search() {
        let cache: SeriesCache = [random_walk("KXA", 1, 120), random_walk("KXB", 2, 120), random_walk("KXC", 3, 20)]
            .into_iter()
            .collect();
        let config = BacktestConfig {
            min_observations: 30,
            ..Default::default()
        };
        let optimizer = Optimizer::multi_ticker(cache.clone(), "KX", config, MetricsConfig::default()).unwrap();
        let grid = ParameterGrid::builder()
            .float("favorite_threshold", [0.6, 0.7, 0.8])
            .build();
        let report = optimizer
            .optimize_kind(StrategyKind::LongFavorite, &grid, ObjectiveMetric::TotalReturn)
            .unwrap();
        assert_eq!(report.ranked.len(), 3);

        // the best run matches a direct multi-ticker backtest of the same parameters
        let best = report.best().unwrap();
        let strategy = StrategyKind::LongFavorite.build(&best.parameters).unwrap();
        let result = Backtest::new(config)
            .unwrap()
            .run_multi_ticker(&cache, &strategy, "KX")
            .unwrap();
        assert_eq!(best.metrics, MetricsReport::from(&result));
    }
}
