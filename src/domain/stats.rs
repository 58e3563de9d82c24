//! Small sample statistics shared by factors, the combiner and metrics.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). Undefined below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// True when `sd` is indistinguishable from rounding noise, e.g. the std of
/// `[0.1, 0.1, 0.1]`. Returns are `ratio - 1`, so the noise floor never drops
/// below the precision of 1.0.
pub fn negligible_dispersion(values: &[f64], sd: f64) -> bool {
    let scale = values.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
    !sd.is_finite() || sd <= DISPERSION_TOLERANCE * scale
}

const DISPERSION_TOLERANCE: f64 = 16.0 * f64::EPSILON;
