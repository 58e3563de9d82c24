//! Instrument universe: code list parsing and data availability checks.
//!
//! The universe is always an explicit list from configuration. Codes without
//! enough data are skipped with a warning; the run fails only when none
//! remain.

use crate::domain::error::FactorbtError;
use crate::domain::price_table::PriceTable;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

pub const MIN_PRICE_BARS: usize = 30;

#[derive(Debug, Clone)]
pub struct Universe {
    pub codes: Vec<String>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.codes.len()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

impl From<UniverseError> for FactorbtError {
    fn from(err: UniverseError) -> Self {
        FactorbtError::ConfigInvalid {
            section: "backtest".into(),
            key: "codes".into(),
            reason: err.to_string(),
        }
    }
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug)]
pub struct UniverseValidationResult {
    pub universe: Universe,
    pub skipped: Vec<SkippedCode>,
}

#[derive(Debug, Clone)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
}

pub fn validate_universe(
    data_port: &dyn DataPort,
    codes: Vec<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<UniverseValidationResult, FactorbtError> {
    let total = codes.len();
    let mut valid_codes = Vec::new();
    let mut skipped = Vec::new();

    for code in codes {
        let closes = match data_port.fetch_closes(&code, start_date, end_date) {
            Ok(data) => data,
            Err(e) => {
                warn!(%code, error = %e, "skipping code");
                skipped.push(SkippedCode {
                    code,
                    reason: SkipReason::NoData,
                });
                continue;
            }
        };

        if closes.is_empty() {
            warn!(%code, "skipping code: no data in range");
            skipped.push(SkippedCode {
                code,
                reason: SkipReason::NoData,
            });
            continue;
        }

        if closes.len() < MIN_PRICE_BARS {
            warn!(
                %code,
                bars = closes.len(),
                minimum = MIN_PRICE_BARS,
                "skipping code: insufficient bars"
            );
            skipped.push(SkippedCode {
                code,
                reason: SkipReason::InsufficientBars { bars: closes.len() },
            });
            continue;
        }

        info!(%code, bars = closes.len(), "code ok");
        valid_codes.push(code);
    }

    if valid_codes.is_empty() {
        return Err(FactorbtError::InsufficientData {
            code: "all".to_string(),
            bars: 0,
            minimum: MIN_PRICE_BARS,
        });
    }

    if !skipped.is_empty() {
        info!(valid = valid_codes.len(), total, "backtesting reduced universe");
    }

    Ok(UniverseValidationResult {
        universe: Universe { codes: valid_codes },
        skipped,
    })
}

/// Fetches every code in the universe and aligns them into one table.
pub fn load_price_table(
    data_port: &dyn DataPort,
    universe: &Universe,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<PriceTable, FactorbtError> {
    let series = universe
        .codes
        .iter()
        .map(|code| {
            data_port
                .fetch_closes(code, start_date, end_date)
                .map(|closes| (code.clone(), closes))
        })
        .collect::<Result<Vec<_>, _>>()?;
    PriceTable::from_series(series)
}
