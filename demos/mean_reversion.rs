mod utils;

use pmbt_rs::prelude::*;
use tracing_subscriber::EnvFilter;

use utils::{example_series, print_report};

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let series = example_series()?;

    let params = Parameters::new()
        .with("window", 20_i64)
        .with("std_threshold", 1.5)
        .with("position_size", 0.2);
    let strategy = MeanReversion::from_params(&params)?;

    let backtest = Backtest::new(BacktestConfig::default())?;
    let result = backtest.run(&series, &strategy)?;
    let metrics = MetricsReport::new(&result, &MetricsConfig::default());

    print_report(&result, &metrics);
    for execution in result.executions.iter().take(5) {
        println!(
            "{} {} {} -> {} x{} pnl {} ({})",
            execution.ticker,
            execution.side,
            execution.entry_price,
            execution.exit_price,
            execution.size,
            execution.pnl,
            execution.exit_reason
        );
    }

    Ok(())
}
