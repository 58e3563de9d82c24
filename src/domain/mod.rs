//! Core domain types and logic.

pub mod backtest;
pub mod calendar;
pub mod combine;
pub mod config_validation;
pub mod error;
pub mod factor;
pub mod fundamentals;
pub mod metrics;
pub mod price_table;
pub mod rebalance;
pub mod score;
pub mod simulation;
pub mod stats;
pub mod universe;
pub mod weights;
