//! Portfolio value simulation.
//!
//! R[t][i]  = C[t][i] / C[t-1][i] - 1, with R[0][i] = 0
//! P[t]     = sum_i W[t-1][i] * R[t][i], with P[0] = 0
//! V[t]     = prod_{k<=t} (1 + P[k]), so V[0] = 1
//!
//! The one-row lag on W is what keeps a decision made with data through day
//! t from earning day t's own return.

use crate::domain::error::FactorbtError;
use crate::domain::price_table::PriceTable;
use crate::domain::weights::WeightTable;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Cumulative value through time, starting at 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSeries {
    pub points: Vec<ValuePoint>,
}

impl ValueSeries {
    /// A price path rescaled so its first value is 1.0, e.g. a benchmark.
    pub fn from_prices(prices: &[(NaiveDate, f64)]) -> Result<Self, FactorbtError> {
        let Some(&(first_date, base)) = prices.first() else {
            return Err(FactorbtError::EmptyPriceTable);
        };
        if !base.is_finite() || base <= 0.0 {
            return Err(FactorbtError::MissingPrice {
                instrument: "benchmark".into(),
                date: first_date,
            });
        }
        Ok(Self {
            points: prices
                .iter()
                .map(|&(date, p)| ValuePoint {
                    date,
                    value: p / base,
                })
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Day-over-day returns; one fewer element than the series.
    pub fn returns(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| w[1].value / w[0].value - 1.0)
            .collect()
    }

    /// The same series restricted to `dates` and rebased to 1.0 on the first
    /// of them. Every date must be present; gaps are not filled.
    pub fn align_to(&self, dates: &[NaiveDate]) -> Result<Self, FactorbtError> {
        let mut aligned = Vec::with_capacity(dates.len());
        for &date in dates {
            let point = self
                .points
                .binary_search_by_key(&date, |p| p.date)
                .map(|i| &self.points[i])
                .map_err(|_| FactorbtError::MissingPrice {
                    instrument: "benchmark".into(),
                    date,
                })?;
            aligned.push((date, point.value));
        }
        Self::from_prices(&aligned)
    }
}

pub fn simulate(prices: &PriceTable, weights: &WeightTable) -> Result<ValueSeries, FactorbtError> {
    if weights.dates() != prices.dates() {
        return Err(FactorbtError::ShapeMismatch {
            reason: "weight and price tables have different date indexes".into(),
        });
    }
    if weights.instruments() != prices.instruments() {
        return Err(FactorbtError::ShapeMismatch {
            reason: "weight and price tables cover different instruments".into(),
        });
    }

    let returns = prices.daily_returns();
    let rows = weights.rows();
    let mut points = Vec::with_capacity(prices.len());
    let mut value = 1.0;

    for (t, &date) in prices.dates().iter().enumerate() {
        if t > 0 {
            let lagged = &rows[t - 1];
            let portfolio_return: f64 = lagged.iter().zip(&returns[t]).map(|(w, r)| w * r).sum();
            value *= 1.0 + portfolio_return;
        }
        points.push(ValuePoint { date, value });
    }

    Ok(ValueSeries { points })
}
