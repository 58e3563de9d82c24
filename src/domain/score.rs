//! Date x instrument table of optional scores.
//!
//! `None` marks an undefined score (insufficient history, unusable ratio,
//! degenerate cross-section). It is never conflated with `Some(0.0)`.

use crate::domain::error::FactorbtError;
use chrono::NaiveDate;

/// Per-instrument scores at one date, aligned with the table's instruments.
pub type CrossSection = Vec<Option<f64>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    dates: Vec<NaiveDate>,
    instruments: Vec<String>,
    rows: Vec<CrossSection>,
}

impl ScoreTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        instruments: Vec<String>,
        rows: Vec<CrossSection>,
    ) -> Result<Self, FactorbtError> {
        if rows.len() != dates.len() {
            return Err(FactorbtError::ShapeMismatch {
                reason: format!("{} score dates but {} rows", dates.len(), rows.len()),
            });
        }
        for (position, pair) in dates.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(FactorbtError::NonIncreasingDates {
                    position: position + 1,
                    date: pair[1],
                });
            }
        }
        if let Some(row) = rows.iter().find(|r| r.len() != instruments.len()) {
            return Err(FactorbtError::ShapeMismatch {
                reason: format!(
                    "score row has {} values, expected {}",
                    row.len(),
                    instruments.len()
                ),
            });
        }
        Ok(Self {
            dates,
            instruments,
            rows,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn rows(&self) -> &[CrossSection] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn row_for(&self, date: NaiveDate) -> Option<&CrossSection> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|t| &self.rows[t])
    }

    pub fn get(&self, date: NaiveDate, code: &str) -> Option<f64> {
        let i = self.instruments.iter().position(|c| c == code)?;
        self.row_for(date).and_then(|row| row[i])
    }
}
