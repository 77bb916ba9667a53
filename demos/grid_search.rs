mod utils;

use pmbt_rs::prelude::*;
use tracing_subscriber::EnvFilter;

use utils::example_cache;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cache = example_cache()?;
    let optimizer = Optimizer::multi_ticker(
        cache.filter("KXFED"),
        "KXFED",
        BacktestConfig::default(),
        MetricsConfig::default(),
    )?;

    let grid = ParameterGrid::builder()
        .int_range("window", 5, 40, 5)
        .float("std_threshold", [1.0, 1.5, 2.0, 2.5])
        .float("position_size", [0.1, 0.25])
        .build();
    println!("Testing {} combinations", grid.total_combinations());

    let report = optimizer.optimize_kind(StrategyKind::MeanReversion, &grid, ObjectiveMetric::SharpeRatio)?;

    println!("=== Top 5 by {} ===", report.objective);
    for run in report.ranked.iter().take(5) {
        println!(
            "{} -> pnl {} trades {} sharpe {:?}",
            run.parameters, run.metrics.total_pnl, run.metrics.total_trades, run.metrics.sharpe_ratio
        );
    }

    let satisfying = report.satisfying(0.5).count();
    println!("{satisfying} runs with a Sharpe ratio above 0.5, {} skipped", report.skipped.len());

    if let Some(best) = report.best() {
        println!("Best parameters: {}", best.parameters);
        println!("{}", best.metrics);
    }

    Ok(())
}
