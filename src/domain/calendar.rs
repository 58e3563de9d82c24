//! Rebalance schedule.

use crate::domain::error::FactorbtError;
use chrono::{Datelike, NaiveDate};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebalanceFrequency {
    /// Last trading day of each calendar month.
    #[default]
    Monthly,
}

impl RebalanceFrequency {
    pub fn schedule(self, dates: &[NaiveDate]) -> Vec<NaiveDate> {
        match self {
            RebalanceFrequency::Monthly => monthly_rebalance_dates(dates),
        }
    }
}

impl FromStr for RebalanceFrequency {
    type Err = FactorbtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(RebalanceFrequency::Monthly),
            other => Err(FactorbtError::ConfigInvalid {
                section: "backtest".into(),
                key: "rebalance".into(),
                reason: format!("unsupported rebalance frequency '{other}', expected monthly"),
            }),
        }
    }
}

/// The last date of every (year, month) run in an increasing date index.
///
/// The final month counts even when it is incomplete.
pub fn monthly_rebalance_dates(dates: &[NaiveDate]) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    for (i, date) in dates.iter().enumerate() {
        let month_ends = match dates.get(i + 1) {
            Some(next) => (next.year(), next.month()) != (date.year(), date.month()),
            None => true,
        };
        if month_ends {
            out.push(*date);
        }
    }
    out
}
