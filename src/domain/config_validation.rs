//! Configuration validation.
//!
//! Validates every recognized key before any data is loaded, so a bad value
//! fails the run up front instead of part-way through.

use crate::domain::calendar::RebalanceFrequency;
use crate::domain::error::FactorbtError;
use crate::domain::factor::{parse_factors, FactorKind};
use crate::domain::rebalance::WeightingMode;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub const DEFAULT_START_DATE: &str = "2018-01-01";
pub const DEFAULT_END_DATE: &str = "2023-01-01";
pub const DEFAULT_FACTORS: &str = "value,momentum,volatility";
pub const DEFAULT_TOP_N: i64 = 10;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    validate_data_path(config)?;
    validate_dates(config)?;
    validate_codes(config)?;
    validate_factors(config)?;
    validate_top_n(config)?;
    validate_weighting(config)?;
    validate_rebalance(config)?;
    validate_risk_free_rate(config)?;
    validate_periods_per_year(config)?;
    validate_windows(config)?;
    validate_factor_weights(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> FactorbtError {
    FactorbtError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_data_path(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    config.require_string("data", "path").map(|_| ())
}

pub fn parse_date(config: &dyn ConfigPort, key: &str, default: &str) -> Result<NaiveDate, FactorbtError> {
    let raw = config
        .get_string("backtest", key)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string());
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| invalid("backtest", key, format!("invalid {key} format, expected YYYY-MM-DD")))
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    let start_date = parse_date(config, "start_date", DEFAULT_START_DATE)?;
    let end_date = parse_date(config, "end_date", DEFAULT_END_DATE)?;
    if start_date > end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    let codes = config.require_string("backtest", "codes")?;
    parse_codes(&codes)?;
    Ok(())
}

pub fn configured_factors(config: &dyn ConfigPort) -> Result<Vec<FactorKind>, FactorbtError> {
    let raw = config
        .get_string("backtest", "factors")
        .unwrap_or_else(|| DEFAULT_FACTORS.to_string());
    let factors = parse_factors(&raw)?;
    if factors.is_empty() {
        return Err(invalid("backtest", "factors", "at least one factor is required"));
    }
    Ok(factors)
}

fn validate_factors(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    configured_factors(config).map(|_| ())
}

fn validate_top_n(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    if let Some(raw) = config.get_string("backtest", "top_n") {
        let value: i64 = raw
            .trim()
            .parse()
            .map_err(|_| invalid("backtest", "top_n", "top_n must be an integer"))?;
        if value < 1 {
            return Err(FactorbtError::InvalidTopN(value));
        }
    }
    Ok(())
}

fn validate_weighting(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    if let Some(raw) = config.get_string("backtest", "weighting") {
        raw.parse::<WeightingMode>()?;
    }
    Ok(())
}

fn validate_rebalance(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    if let Some(raw) = config.get_string("backtest", "rebalance") {
        raw.parse::<RebalanceFrequency>()?;
    }
    Ok(())
}

/// Parses a key that is present; an absent key is `None` so the caller can
/// fall back to its default. A present but malformed value is an error.
fn parse_present<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    expected: &str,
) -> Result<Option<T>, FactorbtError> {
    config
        .get_string(section, key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| invalid(section, key, format!("{key} must be {expected}, got '{raw}'")))
        })
        .transpose()
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    let value = parse_present::<f64>(config, "backtest", "risk_free_rate", "a number")?
        .unwrap_or(0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be in [0, 1)",
        ));
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    let value = parse_present::<i64>(config, "backtest", "periods_per_year", "an integer")?
        .unwrap_or(252);
    if value < 1 || value > i64::from(u32::MAX) {
        return Err(invalid(
            "backtest",
            "periods_per_year",
            "periods_per_year must be a positive integer",
        ));
    }
    Ok(())
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    let momentum = parse_present::<i64>(config, "factors", "momentum_window", "an integer")?
        .unwrap_or(126);
    if momentum < 1 {
        return Err(invalid(
            "factors",
            "momentum_window",
            "momentum_window must be at least 1",
        ));
    }
    let volatility = parse_present::<i64>(config, "factors", "volatility_window", "an integer")?
        .unwrap_or(21);
    if volatility < 2 {
        return Err(invalid(
            "factors",
            "volatility_window",
            "volatility_window must be at least 2",
        ));
    }
    Ok(())
}

fn validate_factor_weights(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    for kind in FactorKind::ALL {
        if let Some(raw) = config.get_string("weights", kind.name()) {
            match raw.trim().parse::<f64>() {
                Ok(w) if w.is_finite() => {}
                _ => {
                    return Err(invalid(
                        "weights",
                        kind.name(),
                        "factor weight must be a finite number",
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const BASE: &str = "[data]\npath = ./data\n[backtest]\ncodes = AAPL,MSFT\n";

    fn with(extra: &str) -> FileConfigAdapter {
        make_config(&format!("{BASE}{extra}"))
    }

    #[test]
    fn valid_full_config_passes() {
        let config = make_config(
            r#"
[data]
path = ./data
benchmark = SPY

[backtest]
start_date = 2018-01-01
end_date = 2023-01-01
codes = AAPL,MSFT,JPM
factors = value,momentum
top_n = 2
weighting = optimizer
rebalance = monthly
risk_free_rate = 0.02
periods_per_year = 252

[factors]
momentum_window = 63
volatility_window = 21

[weights]
value = 0.3
momentum = 0.7
"#,
        );
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_backtest_config(&make_config(BASE)).is_ok());
    }

    #[test]
    fn missing_data_path_fails() {
        let config = make_config("[backtest]\ncodes = AAPL\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, FactorbtError::ConfigMissing { key, .. } if key == "path"));
    }

    #[test]
    fn missing_codes_fails() {
        let config = make_config("[data]\npath = ./data\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, FactorbtError::ConfigMissing { key, .. } if key == "codes"));
    }

    #[test]
    fn duplicate_codes_fail() {
        let config = make_config("[data]\npath = ./data\n[backtest]\ncodes = AAPL,aapl\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "codes"));
    }

    #[test]
    fn invalid_start_date_format_fails() {
        let err = validate_backtest_config(&with("start_date = 2020/01/01\n")).unwrap_err();
        assert!(matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn start_date_after_end_date_fails() {
        let err = validate_backtest_config(&with("start_date = 2024-12-31\nend_date = 2020-01-01\n"))
            .unwrap_err();
        assert!(matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn single_day_range_is_accepted() {
        assert!(validate_backtest_config(&with("start_date = 2024-03-01\nend_date = 2024-03-01\n")).is_ok());
    }

    #[test]
    fn unknown_factor_fails() {
        let err = validate_backtest_config(&with("factors = momentum,size\n")).unwrap_err();
        assert!(matches!(err, FactorbtError::UnknownFactor(name) if name == "size"));
    }

    #[test]
    fn blank_factor_list_fails() {
        let err = validate_backtest_config(&with("factors = ,\n")).unwrap_err();
        assert!(matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "factors"));
    }

    #[test]
    fn top_n_zero_fails() {
        let err = validate_backtest_config(&with("top_n = 0\n")).unwrap_err();
        assert!(matches!(err, FactorbtError::InvalidTopN(0)));
    }

    #[test]
    fn top_n_negative_fails() {
        let err = validate_backtest_config(&with("top_n = -3\n")).unwrap_err();
        assert!(matches!(err, FactorbtError::InvalidTopN(-3)));
    }

    #[test]
    fn top_n_non_numeric_fails() {
        let err = validate_backtest_config(&with("top_n = ten\n")).unwrap_err();
        assert!(matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "top_n"));
    }

    #[test]
    fn unknown_weighting_fails() {
        let err = validate_backtest_config(&with("weighting = opt\n")).unwrap_err();
        assert!(matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "weighting"));
    }

    #[test]
    fn non_monthly_rebalance_fails() {
        let err = validate_backtest_config(&with("rebalance = weekly\n")).unwrap_err();
        assert!(matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "rebalance"));
    }

    #[test]
    fn risk_free_rate_out_of_range_fails() {
        let err = validate_backtest_config(&with("risk_free_rate = 1.5\n")).unwrap_err();
        assert!(matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "risk_free_rate"));
    }

    #[test]
    fn periods_per_year_zero_fails() {
        let err = validate_backtest_config(&with("periods_per_year = 0\n")).unwrap_err();
        assert!(
            matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "periods_per_year")
        );
    }

    #[test]
    fn volatility_window_below_two_fails() {
        let err = validate_backtest_config(&with("[factors]\nvolatility_window = 1\n")).unwrap_err();
        assert!(
            matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "volatility_window")
        );
    }

    #[test]
    fn momentum_window_zero_fails() {
        let err = validate_backtest_config(&with("[factors]\nmomentum_window = 0\n")).unwrap_err();
        assert!(
            matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "momentum_window")
        );
    }

    #[test]
    fn non_numeric_factor_weight_fails() {
        let err = validate_backtest_config(&with("[weights]\nmomentum = heavy\n")).unwrap_err();
        assert!(matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "momentum"));
    }

    #[test]
    fn non_numeric_risk_free_rate_fails() {
        let err = validate_backtest_config(&with("risk_free_rate = abc\n")).unwrap_err();
        assert!(matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "risk_free_rate"));
    }

    #[test]
    fn non_numeric_periods_per_year_fails() {
        let err = validate_backtest_config(&with("periods_per_year = lots\n")).unwrap_err();
        assert!(
            matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "periods_per_year")
        );
    }

    #[test]
    fn non_numeric_momentum_window_fails() {
        let err =
            validate_backtest_config(&with("[factors]\nmomentum_window = six_months\n")).unwrap_err();
        assert!(
            matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "momentum_window")
        );
    }

    #[test]
    fn fractional_volatility_window_fails() {
        let err = validate_backtest_config(&with("[factors]\nvolatility_window = 2.5\n")).unwrap_err();
        assert!(
            matches!(err, FactorbtError::ConfigInvalid { key, .. } if key == "volatility_window")
        );
    }
}
