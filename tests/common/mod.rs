#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Weekday};
use factorbt::domain::error::FactorbtError;
use factorbt::domain::fundamentals::Fundamentals;
use factorbt::domain::price_table::{PricePoint, PriceTable};
use factorbt::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub closes: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
    pub fundamentals: Option<Fundamentals>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            closes: HashMap::new(),
            errors: HashMap::new(),
            fundamentals: None,
        }
    }

    pub fn with_closes(mut self, code: &str, points: Vec<PricePoint>) -> Self {
        self.closes.insert(code.to_string(), points);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }

    pub fn with_fundamentals(mut self, fundamentals: Fundamentals) -> Self {
        self.fundamentals = Some(fundamentals);
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_closes(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, FactorbtError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(FactorbtError::Data {
                reason: reason.clone(),
            });
        }
        let points = self.closes.get(code).ok_or_else(|| FactorbtError::NoData {
            code: code.to_string(),
        })?;
        Ok(points
            .iter()
            .filter(|p| p.date >= start_date && p.date <= end_date)
            .copied()
            .collect())
    }

    fn fetch_fundamentals(&self, _codes: &[String]) -> Result<Fundamentals, FactorbtError> {
        self.fundamentals.clone().ok_or_else(|| FactorbtError::Data {
            reason: "no fundamentals".into(),
        })
    }

    fn list_symbols(&self) -> Result<Vec<String>, FactorbtError> {
        let mut symbols: Vec<String> = self.closes.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, FactorbtError> {
        Ok(self.closes.get(code).and_then(|points| {
            let first = points.first()?;
            let last = points.last()?;
            Some((first.date, last.date, points.len()))
        }))
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// `count` consecutive weekdays starting at `start` (or the next weekday).
pub fn trading_days(start: &str, count: usize) -> Vec<NaiveDate> {
    let mut day = date(start);
    let mut days = Vec::with_capacity(count);
    while days.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        day = day.succ_opt().unwrap();
    }
    days
}

/// Prices compounding at a constant daily rate from `start_price`.
pub fn trending(dates: &[NaiveDate], start_price: f64, daily_rate: f64) -> Vec<PricePoint> {
    dates
        .iter()
        .enumerate()
        .map(|(t, &date)| PricePoint {
            date,
            close: start_price * (1.0 + daily_rate).powi(t as i32),
        })
        .collect()
}

/// Prices alternating up and down by `amplitude` around `level`.
pub fn zigzag(dates: &[NaiveDate], level: f64, amplitude: f64) -> Vec<PricePoint> {
    dates
        .iter()
        .enumerate()
        .map(|(t, &date)| PricePoint {
            date,
            close: if t % 2 == 0 { level } else { level * (1.0 + amplitude) },
        })
        .collect()
}

pub fn points(dates: &[NaiveDate], closes: &[f64]) -> Vec<PricePoint> {
    dates
        .iter()
        .zip(closes)
        .map(|(&date, &close)| PricePoint { date, close })
        .collect()
}

/// Builds a table from per-instrument close columns sharing `dates`.
pub fn table(dates: &[NaiveDate], columns: &[(&str, Vec<f64>)]) -> PriceTable {
    PriceTable::new(
        dates.to_vec(),
        columns.iter().map(|(code, _)| code.to_string()).collect(),
        (0..dates.len())
            .map(|t| columns.iter().map(|(_, c)| c[t]).collect())
            .collect(),
    )
    .unwrap()
}

pub fn snapshot(pe: &[(&str, f64)]) -> Fundamentals {
    Fundamentals::Snapshot(pe.iter().map(|(c, v)| (c.to_string(), *v)).collect())
}
