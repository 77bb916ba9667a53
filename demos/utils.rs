use chrono::{DateTime, Duration, Utc};
use pmbt_rs::prelude::*;
use rust_decimal::Decimal;

/// Generates a deterministic hourly YES price series.
///
/// Prices oscillate around `base_cents` with a seeded phase and are clamped to `[1, 99]`.
pub fn generate_sample_series(ticker: &str, max: i64, seed: i64, base_cents: f64) -> Result<PriceSeries> {
    let start: DateTime<Utc> = DateTime::default();

    let observations = (0..=max)
        .map(|i| {
            // Slow swing plus a faster wobble
            let swing = 12.0 * (i as f64 * 0.05 + seed as f64).sin();
            let wobble = 4.0 * (i as f64 * 0.7 + seed as f64 * 3.0).sin();
            let cents = (base_cents + swing + wobble).round().clamp(1.0, 99.0) as i64;

            let yes = Decimal::from(cents);
            let volume = 100 + (50.0 * (i as f64 * 0.2).sin().abs()) as u64;
            PriceObservation::new(start + Duration::hours(i), yes, Decimal::ONE_HUNDRED - yes, volume)
        })
        .collect::<Result<Vec<_>>>()?;

    PriceSeries::new(ticker, observations)
}

#[allow(dead_code)]
pub fn example_series() -> Result<PriceSeries> {
    generate_sample_series("KXFED-25DEC", 2000, 42, 50.0)
}

#[allow(dead_code)]
pub fn example_cache() -> Result<SeriesCache> {
    let mut cache = SeriesCache::new();
    for (i, ticker) in ["KXFED-25DEC", "KXFED-26JAN", "KXFED-26MAR"].into_iter().enumerate() {
        cache.insert(generate_sample_series(ticker, 1500, 7 + i as i64, 40.0 + 10.0 * i as f64)?);
    }
    Ok(cache)
}

/// Pretty print a backtest result and its metrics.
#[allow(dead_code)]
pub fn print_report(result: &BacktestResult, metrics: &MetricsReport) {
    println!("=== Backtest {} ({}) ===", result.label, result.strategy_name);
    println!("Parameters: {}", result.parameters);
    println!("Initial Capital: {}", result.initial_capital);
    println!("Final Capital: {}", result.final_capital);
    println!("{metrics}");
}

#[allow(dead_code)]
fn main() {}
