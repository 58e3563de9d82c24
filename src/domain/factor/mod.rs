//! Factor library.
//!
//! Each factor turns price history (or fundamental ratios) into one
//! cross-section of scores at an evaluation date, reading only rows at or
//! before that date:
//! - `value`: earnings yield, 1 / P/E
//! - `momentum`: trailing percentage price change
//! - `volatility`: rolling sample std of daily returns (lower is better)
//!
//! [`FactorKind::cross_section`] applies sign normalization so that higher is
//! always more desirable by the time scores reach the combiner.

pub mod momentum;
pub mod value;
pub mod volatility;

use crate::domain::error::FactorbtError;
use crate::domain::fundamentals::Fundamentals;
use crate::domain::price_table::PriceTable;
use crate::domain::score::CrossSection;
use std::fmt;
use std::str::FromStr;

pub use momentum::momentum_factor;
pub use value::value_factor;
pub use volatility::volatility_factor;

pub const DEFAULT_MOMENTUM_WINDOW: usize = 126;
pub const DEFAULT_VOLATILITY_WINDOW: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FactorKind {
    Value,
    Momentum,
    Volatility,
}

impl FactorKind {
    pub const ALL: [FactorKind; 3] = [
        FactorKind::Value,
        FactorKind::Momentum,
        FactorKind::Volatility,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FactorKind::Value => "value",
            FactorKind::Momentum => "momentum",
            FactorKind::Volatility => "volatility",
        }
    }

    /// Whether a raw score must be negated before combination.
    pub fn lower_is_better(self) -> bool {
        matches!(self, FactorKind::Volatility)
    }

    /// Sign-normalized scores for every instrument in `prices` as of row
    /// `as_of`.
    pub fn cross_section(
        self,
        prices: &PriceTable,
        as_of: usize,
        fundamentals: Option<&Fundamentals>,
        params: &FactorParams,
    ) -> Result<CrossSection, FactorbtError> {
        let raw = match self {
            FactorKind::Value => {
                let fundamentals = fundamentals.ok_or_else(|| FactorbtError::ConfigInvalid {
                    section: "backtest".into(),
                    key: "factors".into(),
                    reason: "value factor requires fundamental data".into(),
                })?;
                let pe = fundamentals.pe_ratios_as_of(prices.instruments(), prices.dates()[as_of]);
                value_factor(&pe)
            }
            FactorKind::Momentum => momentum_factor(prices, as_of, params.momentum_window),
            FactorKind::Volatility => volatility_factor(prices, as_of, params.volatility_window),
        };
        if self.lower_is_better() {
            Ok(raw.into_iter().map(|s| s.map(|v| -v)).collect())
        } else {
            Ok(raw)
        }
    }
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FactorKind {
    type Err = FactorbtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "value" => Ok(FactorKind::Value),
            "momentum" => Ok(FactorKind::Momentum),
            "volatility" => Ok(FactorKind::Volatility),
            other => Err(FactorbtError::UnknownFactor(other.to_string())),
        }
    }
}

/// Parses a comma-separated factor list, dropping repeats.
pub fn parse_factors(input: &str) -> Result<Vec<FactorKind>, FactorbtError> {
    let mut factors = Vec::new();
    for token in input.split(',') {
        if token.trim().is_empty() {
            continue;
        }
        let kind: FactorKind = token.parse()?;
        if !factors.contains(&kind) {
            factors.push(kind);
        }
    }
    Ok(factors)
}

/// Lookback windows, in trading days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorParams {
    pub momentum_window: usize,
    pub volatility_window: usize,
}

impl Default for FactorParams {
    fn default() -> Self {
        Self {
            momentum_window: DEFAULT_MOMENTUM_WINDOW,
            volatility_window: DEFAULT_VOLATILITY_WINDOW,
        }
    }
}
