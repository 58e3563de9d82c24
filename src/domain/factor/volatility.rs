//! Volatility factor: rolling standard deviation of daily returns.
//!
//! R[k] = C[k] / C[k-1] - 1
//! VOL(n)[t] = sample std of R[t-n+1..=t]
//! Needs n + 1 prices ending at t and n >= 2. Lower is better; the sign flip
//! happens in `FactorKind::cross_section`, not here.

use crate::domain::price_table::PriceTable;
use crate::domain::score::CrossSection;
use crate::domain::stats::sample_std;

pub fn volatility_factor(prices: &PriceTable, as_of: usize, window: usize) -> CrossSection {
    let instruments = prices.instrument_count();
    if window < 2 || as_of < window || as_of >= prices.len() {
        return vec![None; instruments];
    }

    (0..instruments)
        .map(|i| {
            let returns: Vec<f64> = (as_of + 1 - window..=as_of)
                .map(|k| prices.price(k, i) / prices.price(k - 1, i) - 1.0)
                .collect();
            sample_std(&returns)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn single(prices: &[f64]) -> PriceTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceTable::new(
            (0..prices.len())
                .map(|i| start + chrono::Duration::days(i as i64))
                .collect(),
            vec!["TEST".into()],
            prices.iter().map(|&p| vec![p]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn volatility_warmup() {
        let prices = single(&[100.0, 110.0, 99.0, 101.0]);
        assert_eq!(volatility_factor(&prices, 1, 2), vec![None]);
        assert!(volatility_factor(&prices, 2, 2)[0].is_some());
    }

    #[test]
    fn volatility_of_two_returns() {
        let prices = single(&[100.0, 110.0, 99.0]);
        // returns 0.1 and -0.1: mean 0, sample variance 0.02
        let vol = volatility_factor(&prices, 2, 2)[0].unwrap();
        assert_relative_eq!(vol, 0.02_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn constant_growth_has_zero_volatility() {
        let prices = single(&[100.0, 110.0, 121.0, 133.1]);
        let vol = volatility_factor(&prices, 3, 3)[0].unwrap();
        assert!(vol.abs() < 1e-12);
    }

    #[test]
    fn window_below_two_is_undefined() {
        let prices = single(&[100.0, 110.0, 121.0]);
        assert_eq!(volatility_factor(&prices, 2, 1), vec![None]);
    }
}
