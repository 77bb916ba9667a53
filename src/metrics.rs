//! Performance metrics for backtesting.
//!
//! This module provides tools to calculate, from a [`BacktestResult`]:
//! - Sharpe, Sortino and Calmar ratios
//! - Max and average drawdown
//! - Profit factor, win rate and expectancy
//! - Per-trade return statistics and recovery factor
//!
//! Returns are taken between consecutive points of the equity curve, which is marked per
//! closed trade. Every undefined statistic (zero variance, no losing trade, no drawdown...)
//! is `None`, never zero or infinity.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{BacktestResult, Execution};
use crate::errors::{Error, Result};
use crate::utils::{EPSILON, mean, sample_std_dev, to_f64};

/// Settings of the return-based ratios.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawMetricsConfig"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsConfig {
    /// Number of return periods per year (e.g. 252 trading days).
    pub annualization_factor: f64,
    /// Annual risk-free rate, as a fraction.
    pub risk_free_rate: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            annualization_factor: 252.0,
            risk_free_rate: 0.0,
        }
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawMetricsConfig {
    annualization_factor: f64,
    #[serde(default)]
    risk_free_rate: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawMetricsConfig> for MetricsConfig {
    type Error = Error;

    fn try_from(raw: RawMetricsConfig) -> Result<Self> {
        let config = Self {
            annualization_factor: raw.annualization_factor,
            risk_free_rate: raw.risk_free_rate,
        };
        config.validate()?;
        Ok(config)
    }
}

impl MetricsConfig {
    /// Checks that the annualization factor is positive and the rate is finite.
    pub fn validate(&self) -> Result<()> {
        if !(self.annualization_factor > 0.0 && self.annualization_factor.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "annualization_factor".into(),
                reason: format!("must be > 0, got {}", self.annualization_factor),
            });
        }
        if !self.risk_free_rate.is_finite() {
            return Err(Error::InvalidParameter {
                name: "risk_free_rate".into(),
                reason: format!("must be finite, got {}", self.risk_free_rate),
            });
        }
        Ok(())
    }

    /// Risk-free rate of one return period.
    pub fn period_risk_free_rate(&self) -> f64 {
        self.risk_free_rate / self.annualization_factor
    }
}

/// Scalar statistics of one backtest.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    /// Sum of the realized P&L.
    pub total_pnl: Decimal,
    /// Final capital over initial capital, minus one.
    pub total_return: f64,
    /// Number of closed trades.
    pub total_trades: usize,
    /// Trades with a positive P&L.
    pub winning_trades: usize,
    /// Trades with a negative P&L.
    pub losing_trades: usize,
    /// Mean P&L per trade.
    pub expectancy: Option<Decimal>,
    /// Annualized mean excess return over its standard deviation.
    pub sharpe_ratio: Option<f64>,
    /// Annualized mean excess return over the downside deviation.
    pub sortino_ratio: Option<f64>,
    /// Annualized return over the magnitude of the max drawdown.
    pub calmar_ratio: Option<f64>,
    /// Mean return times the annualization factor.
    pub annualized_return: Option<f64>,
    /// Deepest peak-to-trough decline, as a non-positive fraction.
    pub max_drawdown: Option<f64>,
    /// Mean of the strictly negative drawdowns.
    pub avg_drawdown: Option<f64>,
    /// Winning trades over all trades.
    pub win_rate: Option<f64>,
    /// Gross profit over gross loss.
    pub profit_factor: Option<f64>,
    /// Total return over the magnitude of the max drawdown.
    pub recovery_factor: Option<f64>,
    /// Mean trade P&L as a percentage of the initial capital.
    pub avg_return_pct: Option<f64>,
    /// Sample standard deviation of the trade P&L as a percentage of the initial capital.
    pub std_return_pct: Option<f64>,
    /// Mean return of the winning trades, in percent of their cost.
    pub avg_win_pct: Option<f64>,
    /// Mean return of the losing trades, in percent of their cost.
    pub avg_loss_pct: Option<f64>,
    /// Best trade return, in percent of its cost.
    pub largest_win_pct: Option<f64>,
    /// Worst trade return, in percent of its cost.
    pub largest_loss_pct: Option<f64>,
}

impl From<&BacktestResult> for MetricsReport {
    fn from(value: &BacktestResult) -> Self {
        Self::new(value, &MetricsConfig::default())
    }
}

impl MetricsReport {
    /// Computes every statistic from the same result snapshot.
    pub fn new(result: &BacktestResult, config: &MetricsConfig) -> Self {
        let equity: Vec<f64> = result.equity().map(to_f64).collect();
        let returns = returns(&equity);
        let total_pnl = result.total_pnl();
        let total_trades = result.executions.len();

        let initial = to_f64(result.initial_capital);
        let total_return = if initial > 0.0 {
            (to_f64(result.final_capital) - initial) / initial
        } else {
            0.0
        };

        let annualized_return = mean(&returns).map(|m| m * config.annualization_factor);
        let max_drawdown = max_drawdown(&equity);
        let over_drawdown = |value: f64| match max_drawdown {
            Some(mdd) if mdd < 0.0 => Some(value / mdd.abs()),
            _ => None,
        };

        let trade_returns: Vec<f64> = if initial > 0.0 {
            result
                .executions
                .iter()
                .map(|e| to_f64(e.pnl) / initial * 100.0)
                .collect()
        } else {
            Vec::new()
        };
        let pct = |keep: fn(&Execution) -> bool| -> Vec<f64> {
            result
                .executions
                .iter()
                .filter(|e| keep(e))
                .filter_map(|e| e.return_pct())
                .map(to_f64)
                .collect()
        };
        let all_pct = pct(|_| true);

        Self {
            total_pnl,
            total_return,
            total_trades,
            winning_trades: result.executions.iter().filter(|e| e.is_winner()).count(),
            losing_trades: result.executions.iter().filter(|e| e.is_loser()).count(),
            expectancy: (total_trades > 0).then(|| total_pnl / Decimal::from(total_trades)),
            sharpe_ratio: sharpe_ratio(&returns, config),
            sortino_ratio: sortino_ratio(&returns, config),
            calmar_ratio: annualized_return.and_then(over_drawdown),
            annualized_return,
            max_drawdown,
            avg_drawdown: avg_drawdown(&equity),
            win_rate: win_rate(&result.executions),
            profit_factor: profit_factor(&result.executions),
            recovery_factor: over_drawdown(total_return),
            avg_return_pct: mean(&trade_returns),
            std_return_pct: sample_std_dev(&trade_returns),
            avg_win_pct: mean(&pct(Execution::is_winner)),
            avg_loss_pct: mean(&pct(Execution::is_loser)),
            largest_win_pct: all_pct.iter().copied().max_by(f64::total_cmp),
            largest_loss_pct: all_pct.iter().copied().min_by(f64::total_cmp),
        }
    }

    /// Returns true if `objective` is defined and strictly above `threshold`.
    pub fn meets(&self, objective: ObjectiveMetric, threshold: f64) -> bool {
        objective.value(self).is_some_and(|v| v > threshold)
    }
}

/// Period returns of an equity curve, `(e[i] - e[i-1]) / e[i-1]`.
///
/// Periods starting from a non-positive equity are skipped.
pub fn returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Computes the annualized Sharpe ratio of `returns`.
///
/// `None` with fewer than two returns or a zero standard deviation.
pub fn sharpe_ratio(returns: &[f64], config: &MetricsConfig) -> Option<f64> {
    let excess = excess_returns(returns, config);
    let std_dev = sample_std_dev(&excess)?;
    if std_dev <= EPSILON {
        return None;
    }
    Some(mean(&excess)? / std_dev * config.annualization_factor.sqrt())
}

/// Computes the annualized Sortino ratio of `returns`.
///
/// The downside deviation is the root-mean-square of the negative excess returns.
/// `None` with fewer than two returns or without any negative return.
pub fn sortino_ratio(returns: &[f64], config: &MetricsConfig) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let excess = excess_returns(returns, config);
    let downside: Vec<f64> = excess.iter().filter(|r| **r < 0.0).map(|r| r.powi(2)).collect();
    let downside_dev = mean(&downside)?.sqrt();
    if downside_dev <= EPSILON {
        return None;
    }
    Some(mean(&excess)? / downside_dev * config.annualization_factor.sqrt())
}

/// Computes the maximum drawdown of an equity curve as a non-positive fraction.
///
/// `None` for an empty curve.
pub fn max_drawdown(equity: &[f64]) -> Option<f64> {
    drawdowns(equity).min_by(f64::total_cmp)
}

/// Computes the mean of the strictly negative drawdowns.
///
/// `None` when the curve never falls below its running peak.
pub fn avg_drawdown(equity: &[f64]) -> Option<f64> {
    let negative: Vec<f64> = drawdowns(equity).filter(|d| *d < 0.0).collect();
    mean(&negative)
}

/// Computes the profit factor.
///
/// `None` without any losing trade.
pub fn profit_factor(executions: &[Execution]) -> Option<f64> {
    let (gains, losses) = executions.iter().map(|e| to_f64(e.pnl)).fold((0.0, 0.0), |(gains, losses), pnl| {
        if pnl > 0.0 {
            (gains + pnl, losses)
        } else {
            (gains, losses - pnl)
        }
    });
    if losses <= 0.0 {
        return None;
    }
    Some(gains / losses)
}

/// Computes the fraction of winning trades.
///
/// `None` without any trade.
pub fn win_rate(executions: &[Execution]) -> Option<f64> {
    if executions.is_empty() {
        return None;
    }
    let winners = executions.iter().filter(|e| e.is_winner()).count();
    Some(winners as f64 / executions.len() as f64)
}

fn excess_returns(returns: &[f64], config: &MetricsConfig) -> Vec<f64> {
    let rf = config.period_risk_free_rate();
    returns.iter().map(|r| r - rf).collect()
}

/// Drawdown of each point from the running peak, `(e - peak) / peak`.
fn drawdowns(equity: &[f64]) -> impl Iterator<Item = f64> + '_ {
    let mut peak = f64::NEG_INFINITY;
    equity.iter().map(move |&e| {
        peak = peak.max(e);
        if peak > 0.0 { (e - peak) / peak } else { 0.0 }
    })
}

/// Report field used to rank or filter runs.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ObjectiveMetric {
    /// [`MetricsReport::total_pnl`].
    TotalPnl,
    /// [`MetricsReport::total_return`].
    TotalReturn,
    /// [`MetricsReport::sharpe_ratio`].
    #[default]
    SharpeRatio,
    /// [`MetricsReport::sortino_ratio`].
    SortinoRatio,
    /// [`MetricsReport::calmar_ratio`].
    CalmarRatio,
    /// [`MetricsReport::max_drawdown`], closer to zero ranks higher.
    MaxDrawdown,
    /// [`MetricsReport::win_rate`].
    WinRate,
    /// [`MetricsReport::profit_factor`].
    ProfitFactor,
    /// [`MetricsReport::expectancy`].
    Expectancy,
    /// [`MetricsReport::total_trades`].
    TotalTrades,
}

impl ObjectiveMetric {
    /// All objectives.
    pub const ALL: [Self; 10] = [
        Self::TotalPnl,
        Self::TotalReturn,
        Self::SharpeRatio,
        Self::SortinoRatio,
        Self::CalmarRatio,
        Self::MaxDrawdown,
        Self::WinRate,
        Self::ProfitFactor,
        Self::Expectancy,
        Self::TotalTrades,
    ];

    /// Returns the snake_case name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotalPnl => "total_pnl",
            Self::TotalReturn => "total_return",
            Self::SharpeRatio => "sharpe_ratio",
            Self::SortinoRatio => "sortino_ratio",
            Self::CalmarRatio => "calmar_ratio",
            Self::MaxDrawdown => "max_drawdown",
            Self::WinRate => "win_rate",
            Self::ProfitFactor => "profit_factor",
            Self::Expectancy => "expectancy",
            Self::TotalTrades => "total_trades",
        }
    }

    /// Reads the field from `report`, `None` when undefined.
    pub fn value(&self, report: &MetricsReport) -> Option<f64> {
        match self {
            Self::TotalPnl => Some(to_f64(report.total_pnl)),
            Self::TotalReturn => Some(report.total_return),
            Self::SharpeRatio => report.sharpe_ratio,
            Self::SortinoRatio => report.sortino_ratio,
            Self::CalmarRatio => report.calmar_ratio,
            Self::MaxDrawdown => report.max_drawdown,
            Self::WinRate => report.win_rate,
            Self::ProfitFactor => report.profit_factor,
            Self::Expectancy => report.expectancy.map(to_f64),
            Self::TotalTrades => Some(report.total_trades as f64),
        }
    }
}

impl fmt::Display for ObjectiveMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectiveMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| Error::UnknownObjective(s.to_string()))
    }
}

struct Opt(Option<f64>, &'static str);

impl fmt::Display for Opt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.2}{}", self.1),
            None => f.write_str("n/a"),
        }
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = |v: Option<f64>| Opt(v.map(|v| v * 100.0), "%");
        writeln!(f, "=== Backtest Metrics ===")?;
        writeln!(f, "Profit & Loss (P&L): {:.2}", self.total_pnl)?;
        writeln!(f, "Total Return: {:.2}%", self.total_return * 100.0)?;
        writeln!(f, "Annualized Return: {}", pct(self.annualized_return))?;
        writeln!(f)?;
        writeln!(
            f,
            "Trades: {} ({} won, {} lost)",
            self.total_trades, self.winning_trades, self.losing_trades
        )?;
        writeln!(f, "Win Rate: {}", pct(self.win_rate))?;
        writeln!(f, "Profit Factor: {}", Opt(self.profit_factor, ""))?;
        writeln!(f, "Expectancy: {}", Opt(self.expectancy.map(to_f64), ""))?;
        writeln!(f, "Avg Return/Trade: {}", Opt(self.avg_return_pct, "%"))?;
        writeln!(f, "Std Dev Returns: {}", Opt(self.std_return_pct, "%"))?;
        writeln!(f, "Avg Win: {}", Opt(self.avg_win_pct, "%"))?;
        writeln!(f, "Avg Loss: {}", Opt(self.avg_loss_pct, "%"))?;
        writeln!(f, "Largest Win: {}", Opt(self.largest_win_pct, "%"))?;
        writeln!(f, "Largest Loss: {}", Opt(self.largest_loss_pct, "%"))?;
        writeln!(f)?;
        writeln!(f, "Sharpe Ratio: {}", Opt(self.sharpe_ratio, ""))?;
        writeln!(f, "Sortino Ratio: {}", Opt(self.sortino_ratio, ""))?;
        writeln!(f, "Calmar Ratio: {}", Opt(self.calmar_ratio, ""))?;
        writeln!(f, "Max Drawdown: {}", pct(self.max_drawdown))?;
        writeln!(f, "Avg Drawdown: {}", pct(self.avg_drawdown))?;
        write!(f, "Recovery Factor: {}", Opt(self.recovery_factor, ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::engine::{EquityPoint, ExitReason, PositionSide};
    use crate::strategy::Parameters;

    use chrono::{DateTime, Duration};
    use rust_decimal_macros::dec;

    // One trade per pnl, each closed an hour after the previous one.
    fn result(pnls: &[Decimal]) -> BacktestResult {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let initial = dec!(10000);
        let mut equity = initial;
        let mut executions = Vec::new();
        let mut equity_curve = vec![EquityPoint {
            timestamp: start,
            equity,
        }];
        for (i, pnl) in pnls.iter().enumerate() {
            let exit_time = start + Duration::hours(i as i64 + 1);
            equity += *pnl;
            executions.push(Execution {
                ticker: "KXM".into(),
                side: PositionSide::Long,
                entry_time: exit_time - Duration::minutes(30),
                entry_price: dec!(40),
                exit_time,
                exit_price: dec!(40) + *pnl / dec!(10),
                size: dec!(10),
                pnl: *pnl,
                exit_reason: ExitReason::SignalExit,
            });
            equity_curve.push(EquityPoint {
                timestamp: exit_time,
                equity,
            });
        }
        BacktestResult {
            label: "KXM".into(),
            strategy_name: "test".into(),
            parameters: Parameters::new(),
            initial_capital: initial,
            final_capital: equity,
            executions,
            equity_curve,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_result_is_undefined() {
        let mut empty = result(&[]);
        empty.equity_curve.clear();
        let report = MetricsReport::from(&empty);

        assert_eq!(report.total_trades, 0);
        assert_eq!(report.total_pnl, Decimal::ZERO);
        assert_eq!(report.sharpe_ratio, None);
        assert_eq!(report.sortino_ratio, None);
        assert_eq!(report.calmar_ratio, None);
        assert_eq!(report.max_drawdown, None);
        assert_eq!(report.win_rate, None);
        assert_eq!(report.profit_factor, None);
        assert_eq!(report.expectancy, None);
    }

    #[test]
    fn single_execution_has_no_sharpe() {
        let report = MetricsReport::from(&result(&[dec!(500)]));
        assert_eq!(report.total_trades, 1);
        assert_eq!(report.sharpe_ratio, None);
        assert_eq!(report.sortino_ratio, None);
        assert_eq!(report.win_rate, Some(1.0));
        assert_eq!(report.max_drawdown, Some(0.0));
        assert_eq!(report.calmar_ratio, None);
    }

    #[test]
    fn no_losers_has_no_profit_factor() {
        let report = MetricsReport::from(&result(&[dec!(100), dec!(200), dec!(50)]));
        assert_eq!(report.profit_factor, None);
        assert_eq!(report.sortino_ratio, None);
        assert_eq!(report.avg_drawdown, None);
        assert!(report.sharpe_ratio.is_some_and(|s| s > 0.0));
    }

    #[test]
    fn mixed_trades() {
        // equity: 10000 -> 11000 -> 9900 -> 12000
        let report = MetricsReport::from(&result(&[dec!(1000), dec!(-1100), dec!(2100)]));

        assert_eq!(report.total_pnl, dec!(2000));
        assert!(close(report.total_return, 0.2));
        assert_eq!((report.winning_trades, report.losing_trades), (2, 1));
        assert_eq!(report.expectancy, Some(dec!(2000) / dec!(3)));
        assert!(close(report.win_rate.unwrap(), 2.0 / 3.0));
        assert!(close(report.profit_factor.unwrap(), 3100.0 / 1100.0));
        assert!(close(report.max_drawdown.unwrap(), -0.1));
        assert!(close(report.avg_drawdown.unwrap(), -0.1));

        let r = [0.1, -0.1, 2100.0 / 9900.0];
        let m: f64 = (r[0] + r[1] + r[2]) / 3.0;
        let std = (r.iter().map(|x| (x - m).powi(2)).sum::<f64>() / 2.0).sqrt();
        assert!(close(report.sharpe_ratio.unwrap(), m / std * 252f64.sqrt()));
        // a single negative return of -0.1: downside deviation 0.1
        assert!(close(report.sortino_ratio.unwrap(), m / 0.1 * 252f64.sqrt()));
        assert!(close(report.annualized_return.unwrap(), m * 252.0));
        assert!(close(report.calmar_ratio.unwrap(), m * 252.0 / 0.1));
    }

    #[test]
    fn trade_return_stats() {
        // each trade commits 40 * 10 = 400
        let report = MetricsReport::from(&result(&[dec!(1000), dec!(-1100), dec!(2100)]));

        assert!(close(report.avg_win_pct.unwrap(), (250.0 + 525.0) / 2.0));
        assert!(close(report.avg_loss_pct.unwrap(), -275.0));
        assert!(close(report.largest_win_pct.unwrap(), 525.0));
        assert!(close(report.largest_loss_pct.unwrap(), -275.0));

        // 10%, -11% and 21% of the initial capital
        let pcts = [10.0, -11.0, 21.0];
        let m: f64 = pcts.iter().sum::<f64>() / 3.0;
        let std = (pcts.iter().map(|x| (x - m).powi(2)).sum::<f64>() / 2.0).sqrt();
        assert!(close(report.avg_return_pct.unwrap(), m));
        assert!(close(report.std_return_pct.unwrap(), std));

        // total return 0.2 over a 10% drawdown
        assert!(close(report.recovery_factor.unwrap(), 2.0));
    }

    #[test]
    fn trade_return_stats_undefined() {
        let single = MetricsReport::from(&result(&[dec!(500)]));
        assert!(close(single.largest_win_pct.unwrap(), 125.0));
        assert_eq!(single.largest_win_pct, single.largest_loss_pct);
        assert_eq!(single.avg_loss_pct, None);
        assert!(close(single.avg_return_pct.unwrap(), 5.0));
        assert_eq!(single.std_return_pct, None);
        assert_eq!(single.recovery_factor, None);

        let empty = MetricsReport::from(&result(&[]));
        assert_eq!(empty.avg_win_pct, None);
        assert_eq!(empty.largest_loss_pct, None);
        assert_eq!(empty.avg_return_pct, None);
    }

    #[test]
    fn huge_pnl_does_not_panic() {
        let mut huge = result(&[dec!(1), dec!(-1), dec!(1)]);
        for (execution, pnl) in huge.executions.iter_mut().zip([Decimal::MAX, -Decimal::MAX, Decimal::MAX]) {
            execution.pnl = pnl;
        }
        let report = MetricsReport::from(&huge);
        assert_eq!(report.total_pnl, Decimal::MAX);
        assert!(report.profit_factor.is_some_and(|p| close(p, 2.0)));
    }

    #[test]
    fn constant_returns_have_no_sharpe() {
        let returns = [0.01, 0.01, 0.01];
        assert_eq!(sharpe_ratio(&returns, &MetricsConfig::default()), None);
    }

    #[test]
    fn risk_free_rate_lowers_sharpe() {
        let returns = [0.02, -0.01, 0.03, 0.00];
        let base = sharpe_ratio(&returns, &MetricsConfig::default()).unwrap();
        let config = MetricsConfig {
            risk_free_rate: 0.5,
            ..Default::default()
        };
        assert!(sharpe_ratio(&returns, &config).unwrap() < base);
        assert!(close(config.period_risk_free_rate(), 0.5 / 252.0));
    }

    #[test]
    fn returns_skip_non_positive_equity() {
        assert_eq!(returns(&[100.0, 110.0, 0.0, 50.0]), vec![0.1, -1.0]);
        assert!(returns(&[100.0]).is_empty());
    }

    #[test]
    fn drawdown_stats() {
        assert_eq!(max_drawdown(&[]), None);
        assert_eq!(max_drawdown(&[10000.0, 12000.0, 9000.0, 11000.0]), Some(-0.25));
        assert!(close(avg_drawdown(&[10000.0, 12000.0, 9000.0, 11000.0]).unwrap(), (-0.25 - 1.0 / 12.0) / 2.0));
    }

    #[test]
    fn invalid_config() {
        let config = MetricsConfig {
            annualization_factor: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(MetricsConfig::default().validate().is_ok());
    }

    #[test]
    fn objectives() {
        let report = MetricsReport::from(&result(&[dec!(1000), dec!(-1100), dec!(2100)]));
        assert!(report.meets(ObjectiveMetric::SharpeRatio, 0.5));
        assert!(!report.meets(ObjectiveMetric::WinRate, 0.9));
        assert_eq!(ObjectiveMetric::TotalTrades.value(&report), Some(3.0));

        let single = MetricsReport::from(&result(&[dec!(500)]));
        assert!(!single.meets(ObjectiveMetric::SharpeRatio, f64::MIN));

        assert_eq!("calmar_ratio".parse::<ObjectiveMetric>().unwrap(), ObjectiveMetric::CalmarRatio);
        assert_eq!(
            "alpha".parse::<ObjectiveMetric>(),
            Err(Error::UnknownObjective("alpha".into()))
        );
        for objective in ObjectiveMetric::ALL {
            assert_eq!(objective.to_string().parse::<ObjectiveMetric>().unwrap(), objective);
        }
    }

    #[test]
    fn display_report() {
        let text = MetricsReport::from(&result(&[dec!(500)])).to_string();
        assert!(text.contains("Sharpe Ratio: n/a"));
        assert!(text.contains("Win Rate: 100.00%"));
        assert!(text.contains("Profit & Loss (P&L): 500.00"));
        assert!(text.contains("Largest Win: 125.00%"));
        assert!(text.contains("Avg Loss: n/a"));
        assert!(text.contains("Recovery Factor: n/a"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_from_json_is_validated() {
        let config: MetricsConfig = serde_json::from_str(r#"{"annualization_factor": 365.0}"#).unwrap();
        assert_eq!(config.annualization_factor, 365.0);
        assert_eq!(config.risk_free_rate, 0.0);

        let err = serde_json::from_str::<MetricsConfig>(r#"{"annualization_factor": -1.0}"#).unwrap_err();
        assert!(err.to_string().contains("annualization_factor"), "{err}");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn report_serializes_nulls() {
        let report = MetricsReport::from(&result(&[dec!(500)]));
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["sharpe_ratio"].is_null());
        assert_eq!(json["total_trades"], 1);
    }
}
