//! Inverse-volatility weight optimizer.
//!
//! w[i] = (1 / VOL[i]) / sum_j (1 / VOL[j]), with VOL the sample std of the
//! trailing `window` daily returns as of the last row of the history. When
//! any instrument's volatility is undefined or zero the optimizer falls back
//! to equal weights.

use crate::domain::error::FactorbtError;
use crate::domain::factor::{volatility_factor, DEFAULT_VOLATILITY_WINDOW};
use crate::domain::price_table::PriceTable;
use crate::ports::optimizer_port::WeightOptimizer;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InverseVolatilityOptimizer {
    pub window: usize,
}

impl InverseVolatilityOptimizer {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

impl Default for InverseVolatilityOptimizer {
    fn default() -> Self {
        Self::new(DEFAULT_VOLATILITY_WINDOW)
    }
}

impl WeightOptimizer for InverseVolatilityOptimizer {
    fn optimize(&self, history: &PriceTable) -> Result<Vec<f64>, FactorbtError> {
        let n = history.instrument_count();
        let as_of = history.len().saturating_sub(1);

        let inverse: Option<Vec<f64>> = volatility_factor(history, as_of, self.window)
            .into_iter()
            .map(|vol| vol.filter(|v| *v > 0.0 && v.is_finite()).map(|v| 1.0 / v))
            .collect();

        match inverse {
            Some(inverse) => {
                let total: f64 = inverse.iter().sum();
                Ok(inverse.into_iter().map(|w| w / total).collect())
            }
            None => {
                debug!(
                    instruments = n,
                    window = self.window,
                    "volatility undefined, using equal weights"
                );
                Ok(vec![1.0 / n as f64; n])
            }
        }
    }
}
