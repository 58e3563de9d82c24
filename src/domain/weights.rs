//! Portfolio weights over the full price date index.

use crate::domain::error::FactorbtError;
use chrono::NaiveDate;

/// Target weights decided at one rebalance date.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceRow {
    pub date: NaiveDate,
    pub weights: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    dates: Vec<NaiveDate>,
    instruments: Vec<String>,
    rows: Vec<Vec<f64>>,
    rebalance_dates: Vec<NaiveDate>,
}

impl WeightTable {
    /// Spreads rebalance rows over `dates`, holding each row until the next
    /// rebalance. Dates before the first rebalance are all zero.
    ///
    /// Rebalance rows must be in increasing date order and every rebalance
    /// date must be present in `dates`.
    pub fn forward_fill(
        dates: &[NaiveDate],
        instruments: &[String],
        rebalances: Vec<RebalanceRow>,
    ) -> Result<Self, FactorbtError> {
        for (position, pair) in rebalances.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(FactorbtError::NonIncreasingDates {
                    position: position + 1,
                    date: pair[1].date,
                });
            }
        }
        if let Some(r) = rebalances.iter().find(|r| r.weights.len() != instruments.len()) {
            return Err(FactorbtError::ShapeMismatch {
                reason: format!(
                    "weights for {} have {} entries, expected {}",
                    r.date,
                    r.weights.len(),
                    instruments.len()
                ),
            });
        }
        if let Some(r) = rebalances.iter().find(|r| dates.binary_search(&r.date).is_err()) {
            return Err(FactorbtError::ShapeMismatch {
                reason: format!("rebalance date {} is not in the price index", r.date),
            });
        }

        let rebalance_dates = rebalances.iter().map(|r| r.date).collect();
        let mut pending = rebalances.into_iter().peekable();
        let mut current = vec![0.0; instruments.len()];
        let mut rows = Vec::with_capacity(dates.len());
        for date in dates {
            if let Some(row) = pending.next_if(|r| r.date == *date) {
                current = row.weights;
            }
            rows.push(current.clone());
        }

        Ok(Self {
            dates: dates.to_vec(),
            instruments: instruments.to_vec(),
            rows,
            rebalance_dates,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn rebalance_dates(&self) -> &[NaiveDate] {
        &self.rebalance_dates
    }

    pub fn row_sum(&self, t: usize) -> f64 {
        self.rows[t].iter().sum()
    }

    pub fn weight(&self, date: NaiveDate, code: &str) -> Option<f64> {
        let t = self.dates.binary_search(&date).ok()?;
        let i = self.instruments.iter().position(|c| c == code)?;
        Some(self.rows[t][i])
    }

    /// Instruments with a non-zero weight on `date`.
    pub fn holdings(&self, date: NaiveDate) -> Vec<&str> {
        let Ok(t) = self.dates.binary_search(&date) else {
            return Vec::new();
        };
        self.instruments
            .iter()
            .zip(&self.rows[t])
            .filter(|(_, w)| **w != 0.0)
            .map(|(c, _)| c.as_str())
            .collect()
    }
}
