//! Market data access port.

use crate::domain::error::FactorbtError;
use crate::domain::fundamentals::Fundamentals;
use crate::domain::price_table::PricePoint;
use chrono::NaiveDate;

pub trait DataPort {
    /// Adjusted closes for `code` dated within `[start_date, end_date]`,
    /// sorted by date.
    fn fetch_closes(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, FactorbtError>;

    /// P/E ratios for `codes`, either one snapshot or dated records.
    fn fetch_fundamentals(&self, codes: &[String]) -> Result<Fundamentals, FactorbtError>;

    fn list_symbols(&self) -> Result<Vec<String>, FactorbtError>;

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, FactorbtError>;
}
