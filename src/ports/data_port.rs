//! Data access port trait.

use chrono::NaiveDate;

use crate::domain::bar::Bar;
use crate::domain::error::GridtraderError;

pub trait DataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, GridtraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, GridtraderError>;
}
