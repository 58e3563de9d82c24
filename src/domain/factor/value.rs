//! Value factor: earnings yield.
//!
//! VALUE[i] = 1 / PE[i]
//! A zero, negative or non-finite P/E has no meaningful yield and is undefined.

use crate::domain::score::CrossSection;

pub fn value_factor(pe_ratios: &[Option<f64>]) -> CrossSection {
    pe_ratios
        .iter()
        .map(|pe| match *pe {
            Some(pe) if pe.is_finite() && pe > 0.0 => Some(1.0 / pe),
            _ => None,
        })
        .collect()
}
