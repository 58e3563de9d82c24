//! Report output port.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::FactorbtError;
use std::path::Path;

/// Hands backtest output to a presentation layer.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), FactorbtError>;
}
