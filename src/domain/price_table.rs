//! Date x instrument table of adjusted closing prices.
//!
//! The table is the engine's only market-data input. It is validated once at
//! construction: non-empty, strictly increasing dates, one finite positive
//! price per (date, instrument). Gap filling belongs to whoever supplies the
//! data, so a hole is rejected rather than patched.

use crate::domain::error::FactorbtError;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

/// One dated close for a single instrument, as delivered by a data port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    instruments: Vec<String>,
    /// Row-major: `rows[t][i]` is the close of instrument `i` on `dates[t]`.
    rows: Vec<Vec<f64>>,
}

impl PriceTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        instruments: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, FactorbtError> {
        if dates.is_empty() || instruments.is_empty() {
            return Err(FactorbtError::EmptyPriceTable);
        }
        if rows.len() != dates.len() {
            return Err(FactorbtError::ShapeMismatch {
                reason: format!("{} dates but {} price rows", dates.len(), rows.len()),
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

        let mut seen = HashSet::new();
        for code in &instruments {
            if !seen.insert(code.as_str()) {
                return Err(FactorbtError::DuplicateInstrument(code.clone()));
            }
        }

        for (t, row) in rows.iter().enumerate() {
            if row.len() != instruments.len() {
                return Err(FactorbtError::ShapeMismatch {
                    reason: format!(
                        "row for {} has {} prices, expected {}",
                        dates[t],
                        row.len(),
                        instruments.len()
                    ),
                });
            }
            for (i, &price) in row.iter().enumerate() {
                if !price.is_finite() || price <= 0.0 {
                    return Err(FactorbtError::MissingPrice {
                        instrument: instruments[i].clone(),
                        date: dates[t],
                    });
                }
            }
        }

        Ok(Self {
            dates,
            instruments,
            rows,
        })
    }

    /// Aligns per-instrument series onto their shared date index.
    ///
    /// Every instrument must have a close on every date that any instrument
    /// has; the first hole found is reported as `MissingPrice`. A series with
    /// two closes on one date is rejected as `DuplicateDate`.
    pub fn from_series(series: Vec<(String, Vec<PricePoint>)>) -> Result<Self, FactorbtError> {
        let timeline: Vec<NaiveDate> = series
            .iter()
            .flat_map(|(_, points)| points.iter().map(|p| p.date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut instruments = Vec::with_capacity(series.len());
        let mut columns: Vec<HashMap<NaiveDate, f64>> = Vec::with_capacity(series.len());
        for (code, points) in series {
            let mut column = HashMap::with_capacity(points.len());
            for p in &points {
                if column.insert(p.date, p.close).is_some() {
                    return Err(FactorbtError::DuplicateDate {
                        instrument: code,
                        date: p.date,
                    });
                }
            }
            columns.push(column);
            instruments.push(code);
        }

        let mut rows = Vec::with_capacity(timeline.len());
        for &date in &timeline {
            let mut row = Vec::with_capacity(instruments.len());
            for (i, column) in columns.iter().enumerate() {
                match column.get(&date) {
                    Some(&close) => row.push(close),
                    None => {
                        return Err(FactorbtError::MissingPrice {
                            instrument: instruments[i].clone(),
                            date,
                        });
                    }
                }
            }
            rows.push(row);
        }

        Self::new(timeline, instruments, rows)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    pub fn price(&self, t: usize, instrument: usize) -> f64 {
        self.rows[t][instrument]
    }

    pub fn row(&self, t: usize) -> &[f64] {
        &self.rows[t]
    }

    pub fn date_position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Day-over-day percentage change per instrument; row 0 is all zeros.
    pub fn daily_returns(&self) -> Vec<Vec<f64>> {
        let mut returns = Vec::with_capacity(self.rows.len());
        returns.push(vec![0.0; self.instruments.len()]);
        for pair in self.rows.windows(2) {
            returns.push(
                pair[1]
                    .iter()
                    .zip(&pair[0])
                    .map(|(curr, prev)| curr / prev - 1.0)
                    .collect(),
            );
        }
        returns
    }

    /// Rows dated within `[start, end]`, both inclusive.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Result<Self, FactorbtError> {
        let lo = self.dates.partition_point(|d| *d < start);
        let hi = self.dates.partition_point(|d| *d <= end);
        if lo >= hi {
            return Err(FactorbtError::EmptyPriceTable);
        }
        Ok(Self {
            dates: self.dates[lo..hi].to_vec(),
            instruments: self.instruments.clone(),
            rows: self.rows[lo..hi].to_vec(),
        })
    }

    /// History through `through` (inclusive) for the given columns, in the
    /// order given.
    pub fn select(&self, columns: &[usize], through: usize) -> Result<Self, FactorbtError> {
        let instruments = columns
            .iter()
            .map(|&i| self.instruments[i].clone())
            .collect();
        let rows = self.rows[..=through]
            .iter()
            .map(|row| columns.iter().map(|&i| row[i]).collect())
            .collect();
        Self::new(self.dates[..=through].to_vec(), instruments, rows)
    }
}
