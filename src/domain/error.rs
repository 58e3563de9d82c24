//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for factorbt.
#[derive(Debug, thiserror::Error)]
pub enum FactorbtError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown factor: {0}")]
    UnknownFactor(String),

    #[error("top_n must be a positive integer, got {0}")]
    InvalidTopN(i64),

    #[error("price table is empty")]
    EmptyPriceTable,

    #[error("date index is not strictly increasing at position {position} ({date})")]
    NonIncreasingDates { position: usize, date: NaiveDate },

    #[error("{instrument} has more than one close on {date}")]
    DuplicateDate { instrument: String, date: NaiveDate },

    #[error("missing price for {instrument} on {date}")]
    MissingPrice { instrument: String, date: NaiveDate },

    #[error("duplicate instrument: {0}")]
    DuplicateInstrument(String),

    #[error("shape mismatch: {reason}")]
    ShapeMismatch { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error("optimizer contract violated: {reason}")]
    Optimizer { reason: String },

    #[error("{metric} is undefined: {reason}")]
    UndefinedMetric {
        metric: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&FactorbtError> for std::process::ExitCode {
    fn from(err: &FactorbtError) -> Self {
        let code: u8 = match err {
            FactorbtError::Io(_) => 1,
            FactorbtError::ConfigParse { .. }
            | FactorbtError::ConfigMissing { .. }
            | FactorbtError::ConfigInvalid { .. }
            | FactorbtError::UnknownFactor(_)
            | FactorbtError::InvalidTopN(_) => 2,
            FactorbtError::Data { .. } | FactorbtError::NoData { .. } => 3,
            FactorbtError::EmptyPriceTable
            | FactorbtError::NonIncreasingDates { .. }
            | FactorbtError::DuplicateDate { .. }
            | FactorbtError::MissingPrice { .. }
            | FactorbtError::DuplicateInstrument(_)
            | FactorbtError::ShapeMismatch { .. } => 4,
            FactorbtError::InsufficientData { .. } => 5,
            FactorbtError::Optimizer { .. } | FactorbtError::UndefinedMetric { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = FactorbtError::InvalidTopN(0);
        assert_eq!(err.to_string(), "top_n must be a positive integer, got 0");

        let err = FactorbtError::MissingPrice {
            instrument: "AAPL".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        };
        assert_eq!(err.to_string(), "missing price for AAPL on 2024-01-02");

        let err = FactorbtError::UndefinedMetric {
            metric: "sharpe",
            reason: "zero variance".into(),
        };
        assert_eq!(err.to_string(), "sharpe is undefined: zero variance");
    }

    #[test]
    fn exit_codes_by_family() {
        use std::process::ExitCode;
        let cases = [
            (
                FactorbtError::ConfigMissing {
                    section: "backtest".into(),
                    key: "codes".into(),
                },
                ExitCode::from(2),
            ),
            (FactorbtError::EmptyPriceTable, ExitCode::from(4)),
            (
                FactorbtError::DuplicateDate {
                    instrument: "A".into(),
                    date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                },
                ExitCode::from(4),
            ),
            (
                FactorbtError::NoData { code: "X".into() },
                ExitCode::from(3),
            ),
            (
                FactorbtError::UndefinedMetric {
                    metric: "cagr",
                    reason: "one observation".into(),
                },
                ExitCode::from(6),
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(
                format!("{:?}", ExitCode::from(&err)),
                format!("{:?}", expected)
            );
        }
    }
}
