#![allow(dead_code)]

use chrono::NaiveDate;
use gridtrader::domain::bar::Bar;
use gridtrader::domain::error::GridtraderError;
use gridtrader::domain::metrics::MetricParams;
use gridtrader::domain::simulator::ExecutionConfig;
use gridtrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, GridtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(GridtraderError::DataInvalid {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) => Ok(bars
                .iter()
                .filter(|b| b.date >= start_date && b.date <= end_date)
                .cloned()
                .collect()),
            None => Err(GridtraderError::NoData {
                symbol: symbol.to_string(),
            }),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, GridtraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(day_offset: i64, close: f64) -> Bar {
    Bar {
        date: date(2024, 1, 1) + chrono::Duration::days(day_offset),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 10_000,
    }
}

pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(i as i64, close))
        .collect()
}

pub fn zero_cost_config(capital: f64) -> ExecutionConfig {
    ExecutionConfig {
        initial_capital: capital,
        ..Default::default()
    }
}

pub fn metric_params(capital: f64) -> MetricParams {
    MetricParams {
        initial_capital: capital,
        periods_per_year: 252.0,
        risk_free_rate: 0.0,
    }
}
