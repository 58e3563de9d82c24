//! Momentum factor: trailing rate of change.
//!
//! MOM(n)[t] = C[t] / C[t-n] - 1
//! Needs n + 1 observations ending at t; earlier rows are undefined.

use crate::domain::price_table::PriceTable;
use crate::domain::score::CrossSection;

pub fn momentum_factor(prices: &PriceTable, as_of: usize, window: usize) -> CrossSection {
    let instruments = prices.instrument_count();
    if window == 0 || as_of < window || as_of >= prices.len() {
        return vec![None; instruments];
    }

    (0..instruments)
        .map(|i| {
            let prev = prices.price(as_of - window, i);
            let curr = prices.price(as_of, i);
            if prev == 0.0 {
                None
            } else {
                Some(curr / prev - 1.0)
            }
        })
        .collect()
}
