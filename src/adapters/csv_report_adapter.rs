//! CSV report writer.
//!
//! Writes four files into the output directory:
//!
//! - `values.csv`: date, strategy, benchmark, drawdown
//! - `scores.csv`: combined score per instrument at each rebalance date
//! - `weights.csv`: held weights per instrument for every date
//! - `metrics.csv`: sharpe, max_drawdown, cagr for strategy and benchmark
//!
//! Undefined scores and absent benchmark values are written as empty fields.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::FactorbtError;
use crate::domain::metrics::{drawdown_series, MetricsResult};
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;
use tracing::info;

pub const VALUES_FILE: &str = "values.csv";
pub const SCORES_FILE: &str = "scores.csv";
pub const WEIGHTS_FILE: &str = "weights.csv";
pub const METRICS_FILE: &str = "metrics.csv";

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

type Writer = csv::Writer<fs::File>;

fn open(path: &Path) -> Result<Writer, FactorbtError> {
    csv::Writer::from_path(path).map_err(csv_error)
}

fn csv_error(err: csv::Error) -> FactorbtError {
    FactorbtError::Io(err.into())
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_values(result: &BacktestResult, path: &Path) -> Result<(), FactorbtError> {
    let mut wtr = open(path)?;
    wtr.write_record(["date", "strategy", "benchmark", "drawdown"])
        .map_err(csv_error)?;

    let drawdowns = drawdown_series(&result.values.values());
    for (i, (point, dd)) in result.values.points.iter().zip(drawdowns).enumerate() {
        let benchmark = result
            .benchmark
            .as_ref()
            .and_then(|b| b.points.get(i))
            .map(|p| p.value);
        wtr.write_record([
            point.date.to_string(),
            point.value.to_string(),
            opt(benchmark),
            dd.to_string(),
        ])
        .map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_scores(result: &BacktestResult, path: &Path) -> Result<(), FactorbtError> {
    let mut wtr = open(path)?;
    let scores = &result.scores;

    let header = std::iter::once("date").chain(scores.instruments().iter().map(String::as_str));
    wtr.write_record(header).map_err(csv_error)?;

    for (date, row) in scores.dates().iter().zip(scores.rows()) {
        let fields = std::iter::once(date.to_string()).chain(row.iter().map(|s| opt(*s)));
        wtr.write_record(fields).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_weights(result: &BacktestResult, path: &Path) -> Result<(), FactorbtError> {
    let mut wtr = open(path)?;
    let weights = &result.weights;

    let header = std::iter::once("date").chain(weights.instruments().iter().map(String::as_str));
    wtr.write_record(header).map_err(csv_error)?;

    for (date, row) in weights.dates().iter().zip(weights.rows()) {
        let fields = std::iter::once(date.to_string()).chain(row.iter().map(f64::to_string));
        wtr.write_record(fields).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_metrics(result: &BacktestResult, path: &Path) -> Result<(), FactorbtError> {
    let mut wtr = open(path)?;
    wtr.write_record(["metric", "strategy", "benchmark"])
        .map_err(csv_error)?;

    let bench = result.benchmark_metrics.as_ref();
    let rows: [(&str, fn(&MetricsResult) -> f64); 3] = [
        ("sharpe", |m| m.sharpe),
        ("max_drawdown", |m| m.max_drawdown),
        ("cagr", |m| m.cagr),
    ];
    for (name, get) in rows {
        wtr.write_record([
            name.to_string(),
            get(&result.metrics).to_string(),
            opt(bench.map(get)),
        ])
        .map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), FactorbtError> {
        fs::create_dir_all(output_dir)?;

        write_values(result, &output_dir.join(VALUES_FILE))?;
        write_scores(result, &output_dir.join(SCORES_FILE))?;
        write_weights(result, &output_dir.join(WEIGHTS_FILE))?;
        write_metrics(result, &output_dir.join(METRICS_FILE))?;

        info!(dir = %output_dir.display(), "report written");
        Ok(())
    }
}
