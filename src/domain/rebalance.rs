//! Portfolio construction at rebalance dates.
//!
//! At each rebalance date the instruments with a defined combined score are
//! ranked descending and the first `top_n` are held. Equal scores keep the
//! instruments' column order, so the selection is deterministic. Weights
//! are held until the next rebalance.

use crate::domain::error::FactorbtError;
use crate::domain::price_table::PriceTable;
use crate::domain::score::ScoreTable;
use crate::domain::weights::{RebalanceRow, WeightTable};
use crate::ports::optimizer_port::WeightOptimizer;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::str::FromStr;
use tracing::debug;

/// Weighting choice as written in configuration. Front ends turn
/// `Optimizer` into a [`WeightingPolicy::Optimizer`] with a concrete
/// optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightingMode {
    #[default]
    Equal,
    Optimizer,
}

impl FromStr for WeightingMode {
    type Err = FactorbtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal" => Ok(WeightingMode::Equal),
            "optimizer" => Ok(WeightingMode::Optimizer),
            other => Err(FactorbtError::ConfigInvalid {
                section: "backtest".into(),
                key: "weighting".into(),
                reason: format!("unsupported weighting '{other}', expected equal or optimizer"),
            }),
        }
    }
}

pub enum WeightingPolicy<'a> {
    /// Each selected instrument gets `1 / selected`.
    Equal,
    /// Weights come from an external optimizer, unchecked.
    Optimizer(&'a dyn WeightOptimizer),
}

impl WeightingPolicy<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            WeightingPolicy::Equal => "equal",
            WeightingPolicy::Optimizer(_) => "optimizer",
        }
    }
}

/// Column positions of the best `top_n` defined scores, best first.
pub fn select_top_n(scores: &[Option<f64>], top_n: usize) -> Vec<usize> {
    let mut ranked: Vec<(usize, f64)> = scores
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.filter(|v| v.is_finite()).map(|v| (i, v)))
        .collect();
    // sort_by is stable: ties stay in column order
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(top_n);
    ranked.into_iter().map(|(i, _)| i).collect()
}

pub fn rebalance(
    rebalance_dates: &[NaiveDate],
    scores: &ScoreTable,
    prices: &PriceTable,
    top_n: usize,
    policy: &WeightingPolicy<'_>,
) -> Result<WeightTable, FactorbtError> {
    if top_n == 0 {
        return Err(FactorbtError::InvalidTopN(0));
    }
    if scores.instruments() != prices.instruments() {
        return Err(FactorbtError::ShapeMismatch {
            reason: "score and price tables cover different instruments".into(),
        });
    }

    let mut rows = Vec::with_capacity(rebalance_dates.len());
    for &date in rebalance_dates {
        let t = prices
            .date_position(date)
            .ok_or_else(|| FactorbtError::ShapeMismatch {
                reason: format!("rebalance date {date} is not in the price index"),
            })?;
        let row = scores
            .row_for(date)
            .ok_or_else(|| FactorbtError::ShapeMismatch {
                reason: format!("no combined scores for rebalance date {date}"),
            })?;

        let selected = select_top_n(row, top_n);
        let mut weights = vec![0.0; prices.instrument_count()];

        if selected.len() < top_n {
            debug!(%date, eligible = selected.len(), top_n, "fewer eligible instruments than top_n");
        }

        if !selected.is_empty() {
            match policy {
                WeightingPolicy::Equal => {
                    let w = 1.0 / selected.len() as f64;
                    for &i in &selected {
                        weights[i] = w;
                    }
                }
                WeightingPolicy::Optimizer(optimizer) => {
                    let history = prices.select(&selected, t)?;
                    let optimized = optimizer.optimize(&history)?;
                    if optimized.len() != selected.len() {
                        return Err(FactorbtError::Optimizer {
                            reason: format!(
                                "returned {} weights for {} instruments on {date}",
                                optimized.len(),
                                selected.len()
                            ),
                        });
                    }
                    for (&i, w) in selected.iter().zip(optimized) {
                        weights[i] = w;
                    }
                }
            }
        }

        rows.push(RebalanceRow { date, weights });
    }

    WeightTable::forward_fill(prices.dates(), prices.instruments(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn codes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("C{i}")).collect()
    }

    fn flat_prices(days: u32, n: usize) -> PriceTable {
        PriceTable::new(
            (1..=days).map(d).collect(),
            codes(n),
            (0..days).map(|t| vec![100.0 + t as f64; n]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn parse_weighting_mode() {
        assert_eq!("Equal".parse::<WeightingMode>().unwrap(), WeightingMode::Equal);
        assert_eq!(
            "optimizer".parse::<WeightingMode>().unwrap(),
            WeightingMode::Optimizer
        );
        assert!(matches!(
            "opt".parse::<WeightingMode>(),
            Err(FactorbtError::ConfigInvalid { key, .. }) if key == "weighting"
        ));
    }

    #[test]
    fn select_orders_by_score_descending() {
        let picked = select_top_n(&[Some(0.1), Some(0.9), None, Some(0.5)], 2);
        assert_eq!(picked, vec![1, 3]);
    }

    #[test]
    fn select_breaks_ties_by_column_order() {
        let picked = select_top_n(&[Some(1.0), Some(2.0), Some(2.0), Some(2.0)], 2);
        assert_eq!(picked, vec![1, 2]);
    }

    #[test]
    fn select_takes_what_is_available() {
        let picked = select_top_n(&[None, Some(1.0), None], 5);
        assert_eq!(picked, vec![1]);
        assert!(select_top_n(&[None, None], 3).is_empty());
    }

    #[test]
    fn equal_weights_are_held_between_rebalances() {
        let prices = flat_prices(4, 3);
        let scores = ScoreTable::new(
            vec![d(2)],
            codes(3),
            vec![vec![Some(3.0), Some(1.0), Some(2.0)]],
        )
        .unwrap();
        let table = rebalance(&[d(2)], &scores, &prices, 2, &WeightingPolicy::Equal).unwrap();

        assert_eq!(table.rows()[0], vec![0.0, 0.0, 0.0]);
        assert_eq!(table.rows()[1], vec![0.5, 0.0, 0.5]);
        assert_eq!(table.rows()[3], vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn top_n_zero_is_rejected() {
        let prices = flat_prices(2, 1);
        let scores = ScoreTable::new(vec![d(1)], codes(1), vec![vec![Some(1.0)]]).unwrap();
        let err = rebalance(&[d(1)], &scores, &prices, 0, &WeightingPolicy::Equal).unwrap_err();
        assert!(matches!(err, FactorbtError::InvalidTopN(0)));
    }

    #[test]
    fn no_eligible_instruments_goes_to_cash() {
        let prices = flat_prices(3, 2);
        let scores = ScoreTable::new(
            vec![d(1), d(2)],
            codes(2),
            vec![vec![Some(1.0), Some(0.0)], vec![None, None]],
        )
        .unwrap();
        let table = rebalance(&[d(1), d(2)], &scores, &prices, 1, &WeightingPolicy::Equal).unwrap();
        assert_eq!(table.row_sum(0), 1.0);
        assert_eq!(table.row_sum(1), 0.0);
        assert_eq!(table.row_sum(2), 0.0);
    }

    #[test]
    fn optimizer_sees_history_of_selected_instruments_only() {
        let prices = flat_prices(5, 3);
        let scores = ScoreTable::new(
            vec![d(3)],
            codes(3),
            vec![vec![Some(1.0), Some(3.0), Some(2.0)]],
        )
        .unwrap();
        let optimizer = |history: &PriceTable| -> Result<Vec<f64>, FactorbtError> {
            assert_eq!(history.instruments(), &["C1".to_string(), "C2".to_string()]);
            assert_eq!(history.dates().last(), Some(&d(3)));
            Ok(vec![0.7, 0.2])
        };
        let table = rebalance(
            &[d(3)],
            &scores,
            &prices,
            2,
            &WeightingPolicy::Optimizer(&optimizer),
        )
        .unwrap();
        assert_eq!(table.rows()[4], vec![0.0, 0.7, 0.2]);
        assert_relative_eq!(table.row_sum(4), 0.9, epsilon = 1e-12);
    }

    #[test]
    fn optimizer_wrong_length_is_a_contract_error() {
        let prices = flat_prices(2, 2);
        let scores = ScoreTable::new(vec![d(2)], codes(2), vec![vec![Some(1.0), Some(2.0)]]).unwrap();
        let optimizer = |_: &PriceTable| -> Result<Vec<f64>, FactorbtError> { Ok(vec![1.0]) };
        let err = rebalance(
            &[d(2)],
            &scores,
            &prices,
            2,
            &WeightingPolicy::Optimizer(&optimizer),
        )
        .unwrap_err();
        assert!(matches!(err, FactorbtError::Optimizer { .. }));
    }

    #[test]
    fn rebalance_date_missing_from_scores() {
        let prices = flat_prices(3, 1);
        let scores = ScoreTable::new(vec![d(1)], codes(1), vec![vec![Some(1.0)]]).unwrap();
        let err = rebalance(&[d(2)], &scores, &prices, 1, &WeightingPolicy::Equal).unwrap_err();
        assert!(matches!(err, FactorbtError::ShapeMismatch { .. }));
    }

    proptest! {
        #[test]
        fn equal_rows_sum_to_zero_or_one(
            raw in prop::collection::vec(prop::option::of(-10.0f64..10.0), 1..12),
            top_n in 1usize..8,
        ) {
            let n = raw.len();
            let prices = flat_prices(2, n);
            let scores = ScoreTable::new(vec![d(1)], codes(n), vec![raw.clone()]).unwrap();
            let table = rebalance(&[d(1)], &scores, &prices, top_n, &WeightingPolicy::Equal).unwrap();

            let defined = raw.iter().filter(|s| s.is_some()).count();
            let held = table.holdings(d(1)).len();
            prop_assert!(held <= top_n);
            prop_assert_eq!(held, defined.min(top_n));

            for t in 0..table.dates().len() {
                let sum = table.row_sum(t);
                prop_assert!(sum == 0.0 || (sum - 1.0).abs() < 1e-9);
            }
        }
    }
}
