//! Benchmark and buy-and-hold baseline curves.
//!
//! Baselines are computed once per run into a [`BaselineContext`] and
//! passed by reference wherever comparisons are needed; no function here
//! keeps state between calls.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::bar::Bar;
use crate::domain::metrics::EquityPoint;

/// Baseline curves for a run. `None` means the baseline is disabled.
#[derive(Debug, Clone, Default)]
pub struct BaselineContext {
    pub buyhold: Option<Vec<EquityPoint>>,
    pub benchmark: Option<Vec<EquityPoint>>,
}

/// Buy-and-hold equity over a close series: invest everything at the first
/// point, never trade. Equity_t = capital * close_t / close_0. The first
/// point equals `capital` exactly.
pub fn buy_hold_equity(closes: &[(NaiveDate, f64)], capital: f64) -> Vec<EquityPoint> {
    let first = match closes.first() {
        Some(&(_, c)) => c,
        None => return Vec::new(),
    };
    closes
        .iter()
        .map(|&(date, close)| EquityPoint {
            date,
            value: capital * (close / first),
        })
        .collect()
}

/// Buy-and-hold equity from a bar sequence's closes.
pub fn buy_hold_equity_from_bars(bars: &[Bar], capital: f64) -> Vec<EquityPoint> {
    let closes: Vec<(NaiveDate, f64)> = bars.iter().map(|b| (b.date, b.close)).collect();
    buy_hold_equity(&closes, capital)
}

/// Weighted multi-instrument buy-and-hold: buy
/// floor(capital * weight * utilization / first_close) integer shares of
/// each symbol at the first date, hold; leftover cash rides along.
///
/// `closes` maps each symbol to its close series over a shared, already
/// aligned date index; `dates` is that index.
pub fn weighted_buy_hold_equity(
    dates: &[NaiveDate],
    closes: &BTreeMap<String, Vec<f64>>,
    weights: &BTreeMap<String, f64>,
    utilization: f64,
    capital: f64,
) -> Vec<EquityPoint> {
    if dates.is_empty() {
        return Vec::new();
    }

    let mut cash = capital;
    let mut shares: BTreeMap<&str, f64> = BTreeMap::new();
    for (symbol, series) in closes {
        let weight = weights.get(symbol).copied().unwrap_or(0.0);
        let first = series[0];
        let qty = if first > 0.0 {
            (capital * weight * utilization / first).floor()
        } else {
            0.0
        };
        cash -= qty * first;
        shares.insert(symbol, qty);
    }

    dates
        .iter()
        .enumerate()
        .map(|(i, &date)| {
            let holdings: f64 = closes
                .iter()
                .map(|(symbol, series)| shares[symbol.as_str()] * series[i])
                .sum();
            EquityPoint {
                date,
                value: cash + holdings,
            }
        })
        .collect()
}
