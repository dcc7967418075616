//! CSV file data adapter.
//!
//! Reads `SYMBOL.csv` files of `date,open,high,low,close,volume` rows from
//! a base directory.

use crate::domain::bar::Bar;
use crate::domain::error::GridtraderError;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    symbol: &str,
) -> Result<T, GridtraderError> {
    let raw = record
        .get(index)
        .ok_or_else(|| GridtraderError::DataInvalid {
            symbol: symbol.to_string(),
            reason: format!("missing {} column", name),
        })?;
    raw.trim().parse().map_err(|_| GridtraderError::DataInvalid {
        symbol: symbol.to_string(),
        reason: format!("invalid {} value '{}'", name, raw),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, GridtraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|_| GridtraderError::NoData {
            symbol: symbol.to_string(),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| GridtraderError::DataInvalid {
                symbol: symbol.to_string(),
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| GridtraderError::DataInvalid {
                symbol: symbol.to_string(),
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                GridtraderError::DataInvalid {
                    symbol: symbol.to_string(),
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            bars.push(Bar {
                date,
                open: parse_field(&record, 1, "open", symbol)?,
                high: parse_field(&record, 2, "high", symbol)?,
                low: parse_field(&record, 3, "low", symbol)?,
                close: parse_field(&record, 4, "close", symbol)?,
                volume: parse_field(&record, 5, "volume", symbol)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, GridtraderError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
