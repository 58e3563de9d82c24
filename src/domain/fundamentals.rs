//! Fundamental ratio inputs for the value factor.
//!
//! A `Snapshot` is a single cross-section reused at every evaluation date.
//! That applies today's ratios to past decisions, which is look-ahead biased;
//! it is accepted because it is what most free data sources provide, and
//! the pipeline warns when it is used. `PointInTime` carries dated
//! cross-sections and only ever exposes the latest one at or before the
//! evaluation date.

use chrono::NaiveDate;
use std::collections::HashMap;

/// P/E ratios for one date, keyed by instrument code.
#[derive(Debug, Clone, PartialEq)]
pub struct FundamentalRecord {
    pub date: NaiveDate,
    pub pe_ratios: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fundamentals {
    Snapshot(HashMap<String, f64>),
    PointInTime(Vec<FundamentalRecord>),
}

impl Fundamentals {
    /// Builds a point-in-time set, ordering records by date.
    pub fn point_in_time(mut records: Vec<FundamentalRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        Fundamentals::PointInTime(records)
    }

    pub fn is_point_in_time(&self) -> bool {
        matches!(self, Fundamentals::PointInTime(_))
    }

    /// P/E ratios visible on `as_of`, aligned with `instruments`.
    ///
    /// Instruments without a ratio, and every instrument when no record is
    /// dated on or before `as_of`, get `None`.
    pub fn pe_ratios_as_of(&self, instruments: &[String], as_of: NaiveDate) -> Vec<Option<f64>> {
        let ratios = match self {
            Fundamentals::Snapshot(ratios) => Some(ratios),
            Fundamentals::PointInTime(records) => {
                let visible = records.partition_point(|r| r.date <= as_of);
                visible.checked_sub(1).map(|i| &records[i].pe_ratios)
            }
        };
        match ratios {
            Some(ratios) => instruments.iter().map(|c| ratios.get(c).copied()).collect(),
            None => vec![None; instruments.len()],
        }
    }
}
