//! Performance metrics.
//!
//! Degenerate inputs (zero-variance returns, too few observations,
//! non-positive starting value) are reported as `UndefinedMetric` rather than
//! surfacing as NaN or infinity.

use super::error::FactorbtError;
use super::simulation::ValueSeries;
use super::stats::{mean, negligible_dispersion, sample_std};

pub const TRADING_DAYS_PER_YEAR: u32 = 252;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsResult {
    pub sharpe: f64,
    /// Non-positive fraction, e.g. -0.25 for a 25% peak-to-trough loss.
    pub max_drawdown: f64,
    pub cagr: f64,
}

impl MetricsResult {
    pub fn compute(
        series: &ValueSeries,
        risk_free_rate: f64,
        periods_per_year: u32,
    ) -> Result<Self, FactorbtError> {
        let values = series.values();
        Ok(MetricsResult {
            sharpe: sharpe(&series.returns(), risk_free_rate, periods_per_year)?,
            max_drawdown: max_drawdown(&values),
            cagr: cagr(&values, periods_per_year)?,
        })
    }
}

/// sqrt(P) * mean(excess) / std(excess), excess = r - rf / P.
pub fn sharpe(returns: &[f64], risk_free_rate: f64, periods_per_year: u32) -> Result<f64, FactorbtError> {
    let periods = f64::from(periods_per_year);
    let excess: Vec<f64> = returns.iter().map(|r| r - risk_free_rate / periods).collect();

    let (Some(m), Some(sd)) = (mean(&excess), sample_std(&excess)) else {
        return Err(FactorbtError::UndefinedMetric {
            metric: "sharpe",
            reason: format!("need at least 2 returns, got {}", returns.len()),
        });
    };
    if negligible_dispersion(&excess, sd) {
        return Err(FactorbtError::UndefinedMetric {
            metric: "sharpe",
            reason: "returns have zero variance".into(),
        });
    }
    Ok(periods.sqrt() * m / sd)
}

/// (V[t] - max(V[..=t])) / max(V[..=t]) for every t.
pub fn drawdown_series(values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&v| {
            peak = peak.max(v);
            if peak > 0.0 { (v - peak) / peak } else { 0.0 }
        })
        .collect()
}

/// Deepest drawdown; 0.0 for a series that never falls below its peak.
pub fn max_drawdown(values: &[f64]) -> f64 {
    drawdown_series(values).into_iter().fold(0.0, f64::min)
}

/// (V_last / V_first) ^ (P / n) - 1, where n is the number of observations.
pub fn cagr(values: &[f64], periods_per_year: u32) -> Result<f64, FactorbtError> {
    if values.len() < 2 {
        return Err(FactorbtError::UndefinedMetric {
            metric: "cagr",
            reason: format!("need at least 2 observations, got {}", values.len()),
        });
    }
    let first = values[0];
    let last = values[values.len() - 1];
    if !(first > 0.0) {
        return Err(FactorbtError::UndefinedMetric {
            metric: "cagr",
            reason: format!("initial value must be positive, got {first}"),
        });
    }
    let exponent = f64::from(periods_per_year) / values.len() as f64;
    Ok((last / first).powf(exponent) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn series(values: &[f64]) -> ValueSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let prices: Vec<(NaiveDate, f64)> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| (start + chrono::Duration::days(i as i64), v))
            .collect();
        ValueSeries::from_prices(&prices).unwrap()
    }

    #[test]
    fn sharpe_known_value() {
        let returns = [0.01, 0.02, 0.03];
        // mean 0.02, sample std 0.01
        assert_relative_eq!(
            sharpe(&returns, 0.0, 252).unwrap(),
            252.0_f64.sqrt() * 2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn sharpe_subtracts_per_period_risk_free() {
        let returns = [0.01, 0.02, 0.03];
        let with_rf = sharpe(&returns, 0.252, 252).unwrap();
        // excess mean 0.019
        assert_relative_eq!(with_rf, 252.0_f64.sqrt() * 1.9, epsilon = 1e-9);
    }

    #[test]
    fn sharpe_zero_variance_is_undefined() {
        let err = sharpe(&[0.01, 0.01, 0.01], 0.0, 252).unwrap_err();
        assert!(matches!(err, FactorbtError::UndefinedMetric { metric: "sharpe", .. }));
    }

    #[test]
    fn sharpe_of_repeated_return_is_undefined_not_huge() {
        // the computed std of these is rounding noise, not zero
        let err = sharpe(&[0.1, 0.1, 0.1], 0.0, 252).unwrap_err();
        assert!(matches!(err, FactorbtError::UndefinedMetric { metric: "sharpe", .. }));
    }

    #[test]
    fn sharpe_of_constant_growth_series_is_undefined() {
        let values: Vec<f64> = (0..30).map(|t| 1.003_f64.powi(t)).collect();
        let err = MetricsResult::compute(&series(&values), 0.0, 252).unwrap_err();
        assert!(matches!(err, FactorbtError::UndefinedMetric { metric: "sharpe", .. }));
    }

    #[test]
    fn sharpe_single_return_is_undefined() {
        assert!(sharpe(&[0.01], 0.0, 252).is_err());
    }

    #[test]
    fn max_drawdown_peak_to_trough() {
        let dd = max_drawdown(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        assert_relative_eq!(dd, (80.0 - 110.0) / 110.0, epsilon = 1e-12);
    }

    #[test]
    fn max_drawdown_monotone_is_zero() {
        assert_eq!(max_drawdown(&[1.0, 1.0, 1.2, 1.5]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn drawdown_series_tracks_running_peak() {
        let dd = drawdown_series(&[1.0, 2.0, 1.0, 2.5]);
        assert_eq!(dd, vec![0.0, 0.0, -0.5, 0.0]);
    }

    #[test]
    fn cagr_exponent_uses_observation_count() {
        let value = cagr(&[1.0, 1.21], 252).unwrap();
        assert_relative_eq!(value, 1.21_f64.powf(126.0) - 1.0, max_relative = 1e-12);
        assert!(value > 1e9);
    }

    #[test]
    fn cagr_needs_two_observations() {
        let err = cagr(&[1.0], 252).unwrap_err();
        assert!(matches!(err, FactorbtError::UndefinedMetric { metric: "cagr", .. }));
    }

    #[test]
    fn cagr_needs_positive_start() {
        assert!(cagr(&[0.0, 1.0], 252).is_err());
        assert!(cagr(&[-1.0, 1.0], 252).is_err());
    }

    #[test]
    fn compute_collects_all_three() {
        let metrics = MetricsResult::compute(&series(&[1.0, 1.1, 0.99, 1.05]), 0.0, 252).unwrap();
        assert!(metrics.sharpe.is_finite());
        assert_relative_eq!(metrics.max_drawdown, 0.99 / 1.1 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.cagr, 1.05_f64.powf(63.0) - 1.0, max_relative = 1e-9);
    }

    proptest! {
        #[test]
        fn drawdown_is_never_positive(values in prop::collection::vec(0.01f64..100.0, 0..50)) {
            prop_assert!(max_drawdown(&values) <= 0.0);
            for dd in drawdown_series(&values) {
                prop_assert!(dd <= 0.0 && dd > -1.0);
            }
        }

        #[test]
        fn non_decreasing_series_has_zero_drawdown(steps in prop::collection::vec(0.0f64..0.1, 1..50)) {
            let mut v = 1.0;
            let values: Vec<f64> = steps.iter().map(|s| { v *= 1.0 + s; v }).collect();
            prop_assert_eq!(max_drawdown(&values), 0.0);
        }
    }
}
