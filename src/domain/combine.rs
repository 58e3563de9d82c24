//! Score combiner: cross-sectional z-scores blended by factor weights.
//!
//! For each factor at one date:
//!   Z[i] = (S[i] - mean(S)) / std(S)
//! with mean and sample std taken over the instruments whose raw score is
//! defined at that date. The combined score is sum(w[f] * Z[f][i]). An
//! instrument missing any factor's raw value has no combined score.

use crate::domain::factor::FactorKind;
use crate::domain::score::CrossSection;
use crate::domain::stats::{mean, negligible_dispersion, sample_std};
use std::collections::HashMap;

/// Literal blend weights; absent means uniform `1 / numFactors`.
pub type FactorWeights = HashMap<FactorKind, f64>;

/// Standardizes one cross-section.
///
/// Fewer than two defined values, or zero dispersion, leaves every score
/// undefined for this date.
pub fn zscore(scores: &[Option<f64>]) -> CrossSection {
    let defined: Vec<f64> = scores.iter().filter_map(|s| *s).collect();
    let (Some(m), Some(sd)) = (mean(&defined), sample_std(&defined)) else {
        return vec![None; scores.len()];
    };
    if negligible_dispersion(&defined, sd) {
        return vec![None; scores.len()];
    }
    scores.iter().map(|s| s.map(|v| (v - m) / sd)).collect()
}

/// Blends factor cross-sections into one score per instrument.
///
/// A factor absent from a supplied `weights` map keeps weight 1.0. Weights
/// are used as given; they need not sum to one.
pub fn combine(
    factor_scores: &[(FactorKind, CrossSection)],
    weights: Option<&FactorWeights>,
) -> CrossSection {
    let Some((_, first)) = factor_scores.first() else {
        return Vec::new();
    };
    let width = first.len();
    let uniform = 1.0 / factor_scores.len() as f64;

    let mut total: CrossSection = vec![Some(0.0); width];
    for (kind, raw) in factor_scores {
        let weight = match weights {
            Some(w) => w.get(kind).copied().unwrap_or(1.0),
            None => uniform,
        };
        let z = zscore(raw);
        for (acc, zi) in total.iter_mut().zip(z.iter().chain(std::iter::repeat(&None))) {
            *acc = match (*acc, *zi) {
                (Some(sum), Some(zi)) => Some(sum + weight * zi),
                _ => None,
            };
        }
    }
    total
}
