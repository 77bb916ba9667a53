use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Arithmetic mean, `None` for an empty slice.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1), `None` with fewer than two values.
pub(crate) fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Rolling mean and sample standard deviation over `window` values ending at each index.
///
/// Entries for the first `window - 1` indices are `None`.
pub(crate) fn rolling_mean_std(values: &[f64], window: usize) -> Vec<Option<(f64, f64)>> {
    (0..values.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            Some((mean(slice)?, sample_std_dev(slice)?))
        })
        .collect()
}

/// Lossy conversion used at the boundary between money and statistics.
pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// Float tolerance below which a standard deviation counts as zero.
pub(crate) const EPSILON: f64 = 1e-12;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_std() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(sample_std_dev(&[1.0]), None);
        assert_eq!(sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).map(|s| (s * 1e6).round()), Some(2138090.0));
    }

    #[test]
    fn rolling_window_includes_current_value() {
        let rolling = rolling_mean_std(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(rolling[0], None);
        assert_eq!(rolling[1], None);
        assert_eq!(rolling[2], Some((2.0, 1.0)));
        assert_eq!(rolling[3], Some((3.0, 1.0)));
    }

    #[test]
    fn rolling_mean_matches_ta_sma() {
        use ta::Next;
        use ta::indicators::SimpleMovingAverage;

        let values = [0.42, 0.45, 0.40, 0.38, 0.47, 0.51, 0.49, 0.30, 0.33, 0.41];
        let mut sma = SimpleMovingAverage::new(4).unwrap();
        let rolling = rolling_mean_std(&values, 4);

        for (i, value) in values.iter().enumerate() {
            let expected = sma.next(*value);
            if let Some((mean, _)) = rolling[i] {
                assert!((mean - expected).abs() < 1e-9, "index {i}: {mean} != {expected}");
            }
        }
    }
}
