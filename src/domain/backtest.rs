//! Backtest pipeline: factors -> combined scores -> weights -> values -> metrics.
//!
//! BacktestConfig carries every parameter explicitly; nothing is read from
//! the environment.

use crate::domain::calendar::RebalanceFrequency;
use crate::domain::combine::{combine, FactorWeights};
use crate::domain::error::FactorbtError;
use crate::domain::factor::{FactorKind, FactorParams};
use crate::domain::fundamentals::Fundamentals;
use crate::domain::metrics::{MetricsResult, TRADING_DAYS_PER_YEAR};
use crate::domain::price_table::PriceTable;
use crate::domain::rebalance::{rebalance, WeightingPolicy};
use crate::domain::score::{CrossSection, ScoreTable};
use crate::domain::simulation::{simulate, ValueSeries};
use crate::domain::weights::WeightTable;
use chrono::NaiveDate;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub factors: Vec<FactorKind>,
    /// `None` blends factors uniformly.
    pub factor_weights: Option<FactorWeights>,
    pub top_n: usize,
    pub rebalance: RebalanceFrequency,
    pub params: FactorParams,
    pub risk_free_rate: f64,
    pub periods_per_year: u32,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            factors: FactorKind::ALL.to_vec(),
            factor_weights: None,
            top_n: 10,
            rebalance: RebalanceFrequency::Monthly,
            params: FactorParams::default(),
            risk_free_rate: 0.0,
            periods_per_year: TRADING_DAYS_PER_YEAR,
        }
    }

    /// Checks the parameters that make the run meaningless if wrong.
    pub fn validate(&self, fundamentals: Option<&Fundamentals>) -> Result<(), FactorbtError> {
        if self.top_n == 0 {
            return Err(FactorbtError::InvalidTopN(0));
        }
        if self.factors.is_empty() {
            return Err(FactorbtError::ConfigInvalid {
                section: "backtest".into(),
                key: "factors".into(),
                reason: "at least one factor is required".into(),
            });
        }
        if self.start_date > self.end_date {
            return Err(FactorbtError::ConfigInvalid {
                section: "backtest".into(),
                key: "start_date".into(),
                reason: "start_date must not be after end_date".into(),
            });
        }
        if self.periods_per_year == 0 {
            return Err(FactorbtError::ConfigInvalid {
                section: "backtest".into(),
                key: "periods_per_year".into(),
                reason: "periods_per_year must be positive".into(),
            });
        }
        if self.factors.contains(&FactorKind::Value) && fundamentals.is_none() {
            return Err(FactorbtError::ConfigInvalid {
                section: "backtest".into(),
                key: "factors".into(),
                reason: "value factor requires fundamental data".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub values: ValueSeries,
    pub benchmark: Option<ValueSeries>,
    pub scores: ScoreTable,
    pub weights: WeightTable,
    pub metrics: MetricsResult,
    pub benchmark_metrics: Option<MetricsResult>,
}

/// Sign-normalized factor cross-sections blended into one score row as of
/// row `as_of`. Depends only on rows `..=as_of`.
pub fn score_at(
    prices: &PriceTable,
    as_of: usize,
    fundamentals: Option<&Fundamentals>,
    config: &BacktestConfig,
) -> Result<CrossSection, FactorbtError> {
    let factor_scores = config
        .factors
        .iter()
        .map(|&kind| {
            kind.cross_section(prices, as_of, fundamentals, &config.params)
                .map(|scores| (kind, scores))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(combine(&factor_scores, config.factor_weights.as_ref()))
}

/// Combined score table over the given rebalance dates.
pub fn score_table(
    prices: &PriceTable,
    rebalance_dates: &[NaiveDate],
    fundamentals: Option<&Fundamentals>,
    config: &BacktestConfig,
) -> Result<ScoreTable, FactorbtError> {
    let rows = rebalance_dates
        .iter()
        .map(|&date| {
            let t = prices
                .date_position(date)
                .ok_or_else(|| FactorbtError::ShapeMismatch {
                    reason: format!("rebalance date {date} is not in the price index"),
                })?;
            score_at(prices, t, fundamentals, config)
        })
        .collect::<Result<Vec<_>, _>>()?;
    ScoreTable::new(
        rebalance_dates.to_vec(),
        prices.instruments().to_vec(),
        rows,
    )
}

pub fn run_backtest(
    prices: &PriceTable,
    fundamentals: Option<&Fundamentals>,
    benchmark: Option<&ValueSeries>,
    config: &BacktestConfig,
    policy: &WeightingPolicy<'_>,
) -> Result<BacktestResult, FactorbtError> {
    config.validate(fundamentals)?;

    if config.factors.contains(&FactorKind::Value)
        && fundamentals.is_some_and(|f| !f.is_point_in_time())
    {
        warn!("value factor uses a single P/E snapshot for every rebalance date (look-ahead bias)");
    }

    let prices = prices.between(config.start_date, config.end_date)?;
    let rebalance_dates = config.rebalance.schedule(prices.dates());
    info!(
        dates = prices.len(),
        instruments = prices.instrument_count(),
        rebalances = rebalance_dates.len(),
        weighting = policy.name(),
        "running backtest"
    );

    let scores = score_table(&prices, &rebalance_dates, fundamentals, config)?;
    let weights = rebalance(&rebalance_dates, &scores, &prices, config.top_n, policy)?;
    let values = simulate(&prices, &weights)?;
    let metrics = MetricsResult::compute(&values, config.risk_free_rate, config.periods_per_year)?;

    let benchmark = benchmark
        .map(|b| b.align_to(prices.dates()))
        .transpose()?;
    let benchmark_metrics = benchmark
        .as_ref()
        .map(|b| MetricsResult::compute(b, config.risk_free_rate, config.periods_per_year))
        .transpose()?;

    Ok(BacktestResult {
        values,
        benchmark,
        scores,
        weights,
        metrics,
        benchmark_metrics,
    })
}
