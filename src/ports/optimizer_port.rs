//! Weight optimizer port.

use crate::domain::error::FactorbtError;
use crate::domain::price_table::PriceTable;

/// External weight optimization used by `WeightingPolicy::Optimizer`.
///
/// `history` holds prices through the rebalance date, restricted to the
/// selected instruments in rank order. The returned vector is aligned with
/// `history.instruments()` and used as-is; its sum is not checked.
pub trait WeightOptimizer {
    fn optimize(&self, history: &PriceTable) -> Result<Vec<f64>, FactorbtError>;
}

impl<F> WeightOptimizer for F
where
    F: Fn(&PriceTable) -> Result<Vec<f64>, FactorbtError>,
{
    fn optimize(&self, history: &PriceTable) -> Result<Vec<f64>, FactorbtError> {
        self(history)
    }
}
