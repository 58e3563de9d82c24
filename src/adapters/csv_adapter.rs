//! CSV file data adapter.
//!
//! Prices live in `<base>/<CODE>.csv` with a `date` column and an
//! `adj_close` or `close` column (`adj_close` wins when both exist).
//! Fundamentals live in one file, `fundamentals.csv` by default: a
//! `code,pe` header is a snapshot, `date,code,pe` is point-in-time.

use crate::domain::error::FactorbtError;
use crate::domain::fundamentals::{FundamentalRecord, Fundamentals};
use crate::domain::price_table::PricePoint;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FUNDAMENTALS_FILE: &str = "fundamentals.csv";

pub struct CsvAdapter {
    base_path: PathBuf,
    fundamentals_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        let fundamentals_path = base_path.join(DEFAULT_FUNDAMENTALS_FILE);
        Self {
            base_path,
            fundamentals_path,
        }
    }

    /// Overrides the fundamentals file. Relative paths resolve against the
    /// data directory.
    pub fn with_fundamentals_file(mut self, file: impl AsRef<Path>) -> Self {
        self.fundamentals_path = self.base_path.join(file);
        self
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{code}.csv"))
    }

    fn read_closes(&self, code: &str) -> Result<Vec<PricePoint>, FactorbtError> {
        let path = self.csv_path(code);
        if !path.exists() {
            return Err(FactorbtError::NoData {
                code: code.to_string(),
            });
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|e| data_error(&path, e))?;
        let headers = rdr.headers().map_err(|e| data_error(&path, e))?.clone();
        let date_col = column(&headers, "date").ok_or_else(|| FactorbtError::Data {
            reason: format!("{}: missing date column", path.display()),
        })?;
        let close_col = column(&headers, "adj_close")
            .or_else(|| column(&headers, "close"))
            .ok_or_else(|| FactorbtError::Data {
                reason: format!("{}: missing close or adj_close column", path.display()),
            })?;

        let mut points = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| data_error(&path, e))?;
            let date = parse_date(record.get(date_col).unwrap_or(""), &path, line)?;
            let raw = record.get(close_col).unwrap_or("").trim();
            let close: f64 = raw.parse().map_err(|_| FactorbtError::Data {
                reason: format!(
                    "{}: invalid close '{raw}' on row {}",
                    path.display(),
                    line + 1
                ),
            })?;
            points.push(PricePoint { date, close });
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

fn data_error(path: &Path, err: impl std::fmt::Display) -> FactorbtError {
    FactorbtError::Data {
        reason: format!("{}: {err}", path.display()),
    }
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn parse_date(raw: &str, path: &Path, line: usize) -> Result<NaiveDate, FactorbtError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| FactorbtError::Data {
        reason: format!(
            "{}: invalid date '{}' on row {}",
            path.display(),
            raw.trim(),
            line + 1
        ),
    })
}

/// Finite P/E, or `None` for blanks and junk.
fn parse_pe(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl DataPort for CsvAdapter {
    fn fetch_closes(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, FactorbtError> {
        let mut points = self.read_closes(code)?;
        points.retain(|p| p.date >= start_date && p.date <= end_date);
        Ok(points)
    }

    fn fetch_fundamentals(&self, codes: &[String]) -> Result<Fundamentals, FactorbtError> {
        let path = &self.fundamentals_path;
        let mut rdr = csv::Reader::from_path(path).map_err(|e| data_error(path, e))?;
        let headers = rdr.headers().map_err(|e| data_error(path, e))?.clone();
        let code_col = column(&headers, "code").ok_or_else(|| FactorbtError::Data {
            reason: format!("{}: missing code column", path.display()),
        })?;
        let pe_col = column(&headers, "pe").ok_or_else(|| FactorbtError::Data {
            reason: format!("{}: missing pe column", path.display()),
        })?;
        let date_col = column(&headers, "date");

        let wanted: HashSet<String> = codes.iter().map(|c| c.to_uppercase()).collect();
        let mut snapshot = HashMap::new();
        let mut dated: BTreeMap<NaiveDate, HashMap<String, f64>> = BTreeMap::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| data_error(path, e))?;
            let code = record.get(code_col).unwrap_or("").trim().to_uppercase();
            if !wanted.contains(&code) {
                continue;
            }
            match date_col {
                Some(col) => {
                    let date = parse_date(record.get(col).unwrap_or(""), path, line)?;
                    let ratios = dated.entry(date).or_default();
                    if let Some(pe) = parse_pe(record.get(pe_col)) {
                        ratios.insert(code, pe);
                    }
                }
                None => {
                    if let Some(pe) = parse_pe(record.get(pe_col)) {
                        snapshot.insert(code, pe);
                    }
                }
            }
        }

        Ok(match date_col {
            Some(_) => Fundamentals::point_in_time(
                dated
                    .into_iter()
                    .map(|(date, pe_ratios)| FundamentalRecord { date, pe_ratios })
                    .collect(),
            ),
            None => Fundamentals::Snapshot(snapshot),
        })
    }

    fn list_symbols(&self) -> Result<Vec<String>, FactorbtError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| data_error(&self.base_path, e))?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(&self.base_path, e))?;
            let path = entry.path();
            if path == self.fundamentals_path {
                continue;
            }
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if let (true, Some(stem)) = (is_csv, path.file_stem()) {
                symbols.push(stem.to_string_lossy().to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, FactorbtError> {
        let points = match self.read_closes(code) {
            Ok(points) => points,
            Err(FactorbtError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (points.first(), points.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, points.len())),
            _ => None,
        })
    }
}
