//! Multi-instrument portfolio simulator.
//!
//! One shared cash pool across N instruments, each with its own entry/exit
//! conditions but a common execution/cost model. Bars are aligned to the
//! intersection of all instruments' dates; instruments are processed in
//! configured order on every bar, so fills against shared cash are
//! deterministic. Decisions at bar i fill at bar i+1, as in the
//! single-instrument simulator.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::warn;

use crate::domain::bar::Bar;
use crate::domain::baseline::{buy_hold_equity, weighted_buy_hold_equity, BaselineContext};
use crate::domain::condition::{extract_indicators, Condition, Logic};
use crate::domain::error::GridtraderError;
use crate::domain::indicator::compute_indicators;
use crate::domain::metrics::{
    kpis_from_equity, metrics_report, summarize_comparisons, EquityPoint, MetricParams,
    TradeStats,
};
use crate::domain::signal::evaluate_conditions;
use crate::domain::simulator::{ExecutionConfig, Side};

/// Per-instrument strategy: which conditions govern this symbol.
#[derive(Debug, Clone)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub entry_conditions: Vec<Condition>,
    pub exit_conditions: Vec<Condition>,
    pub entry_logic: Logic,
    pub exit_logic: Logic,
}

/// A fill against the shared cash pool. Sell fills carry the realized
/// round-trip P&L.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioFill {
    pub date: NaiveDate,
    pub symbol: String,
    pub side: Side,
    pub price: f64,
    pub quantity: i64,
    pub fee: f64,
    pub pnl: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PortfolioResult {
    pub equity: Vec<EquityPoint>,
    /// Mark-to-market exposure per symbol, one point per aligned bar.
    pub per_symbol_equity: BTreeMap<String, Vec<EquityPoint>>,
    pub fills: Vec<PortfolioFill>,
    pub stats: TradeStats,
    pub buyhold_equity: Vec<EquityPoint>,
    pub benchmark_equity: Option<Vec<EquityPoint>>,
}

impl PortfolioResult {
    /// Flat fixed-key metrics map, including `buyhold_*` and (when a
    /// benchmark was supplied) `bench_*` comparison sets.
    pub fn metrics_report(&self, params: &MetricParams) -> BTreeMap<String, f64> {
        let baselines = BaselineContext {
            buyhold: Some(self.buyhold_equity.clone()),
            benchmark: self.benchmark_equity.clone(),
        };
        let kpis = kpis_from_equity(&self.equity, params);
        let comparisons = summarize_comparisons(&self.equity, &baselines, params);
        metrics_report(&kpis, &self.stats, &comparisons)
    }
}

/// Filter supplied weights to the configured symbols, re-normalize them to
/// sum to 1, and fall back to equal weight when nothing usable remains.
pub fn normalize_weights(
    supplied: Option<&BTreeMap<String, f64>>,
    symbols: &[String],
) -> BTreeMap<String, f64> {
    if let Some(weights) = supplied {
        for key in weights.keys() {
            if !symbols.contains(key) {
                warn!(symbol = %key, "ignoring weight for unlisted symbol");
            }
        }
        let filtered: BTreeMap<String, f64> = weights
            .iter()
            .filter(|(k, _)| symbols.contains(*k))
            .map(|(k, &v)| (k.clone(), v))
            .collect();
        let total: f64 = filtered.values().sum();
        if !filtered.is_empty() && total > 0.0 {
            return filtered.into_iter().map(|(k, v)| (k, v / total)).collect();
        }
    }

    let eq = 1.0 / symbols.len().max(1) as f64;
    symbols.iter().map(|s| (s.clone(), eq)).collect()
}

/// Restrict every symbol's bars to the dates all symbols share.
pub fn align_bars(
    data: &BTreeMap<String, Vec<Bar>>,
) -> (Vec<NaiveDate>, BTreeMap<String, Vec<Bar>>) {
    let mut common: Option<Vec<NaiveDate>> = None;
    for bars in data.values() {
        let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
        common = Some(match common {
            None => dates,
            Some(existing) => existing.into_iter().filter(|d| dates.contains(d)).collect(),
        });
    }
    let common = common.unwrap_or_default();

    let aligned = data
        .iter()
        .map(|(symbol, bars)| {
            let filtered: Vec<Bar> = bars
                .iter()
                .filter(|b| common.contains(&b.date))
                .cloned()
                .collect();
            (symbol.clone(), filtered)
        })
        .collect();

    (common, aligned)
}

pub fn simulate_portfolio(
    data: &BTreeMap<String, Vec<Bar>>,
    specs: &[InstrumentSpec],
    weights: &BTreeMap<String, f64>,
    utilization: f64,
    benchmark_bars: Option<&[Bar]>,
    config: &ExecutionConfig,
) -> Result<PortfolioResult, GridtraderError> {
    for spec in specs {
        if !data.contains_key(&spec.symbol) {
            return Err(GridtraderError::NoData {
                symbol: spec.symbol.clone(),
            });
        }
    }

    let (dates, aligned) = align_bars(data);
    if dates.is_empty() {
        return Err(GridtraderError::EmptyBars);
    }
    let n = dates.len();

    // signals per instrument over the aligned window
    let mut entry_signals: BTreeMap<&str, Vec<bool>> = BTreeMap::new();
    let mut exit_signals: BTreeMap<&str, Vec<bool>> = BTreeMap::new();
    for spec in specs {
        let bars = &aligned[&spec.symbol];
        let mut types = extract_indicators(&spec.entry_conditions);
        for ty in extract_indicators(&spec.exit_conditions) {
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
        let indicators = compute_indicators(bars, &types);
        entry_signals.insert(
            &spec.symbol,
            evaluate_conditions(&spec.entry_conditions, spec.entry_logic, bars, &indicators)?,
        );
        exit_signals.insert(
            &spec.symbol,
            evaluate_conditions(&spec.exit_conditions, spec.exit_logic, bars, &indicators)?,
        );
    }

    let fee_in = config.entry_fee_bps / 1e4;
    let fee_out = config.exit_fee_bps / 1e4;
    let init_cap = config.initial_capital;

    let mut cash = init_cap;
    let mut positions: BTreeMap<&str, i64> = BTreeMap::new();
    let mut cost_basis: BTreeMap<&str, f64> = BTreeMap::new();
    let mut entry_fees: BTreeMap<&str, f64> = BTreeMap::new();
    for spec in specs {
        positions.insert(&spec.symbol, 0);
        cost_basis.insert(&spec.symbol, 0.0);
        entry_fees.insert(&spec.symbol, 0.0);
    }

    let mut fills: Vec<PortfolioFill> = Vec::new();
    let mut round_trip_pnls: Vec<f64> = Vec::new();
    let mut entries = 0usize;
    let mut exits = 0usize;

    let mut equity = Vec::with_capacity(n);
    equity.push(EquityPoint {
        date: dates[0],
        value: cash,
    });
    let mut per_symbol_equity: BTreeMap<String, Vec<EquityPoint>> = specs
        .iter()
        .map(|s| {
            (
                s.symbol.clone(),
                vec![EquityPoint {
                    date: dates[0],
                    value: 0.0,
                }],
            )
        })
        .collect();

    for i in 0..n - 1 {
        let holdings: f64 = specs
            .iter()
            .map(|s| positions[s.symbol.as_str()] as f64 * aligned[&s.symbol][i].close)
            .sum();
        let total_equity_before = cash + holdings;

        for spec in specs {
            let symbol = spec.symbol.as_str();
            let next = &aligned[&spec.symbol][i + 1];
            let weight = weights.get(symbol).copied().unwrap_or(0.0);
            let position = positions[symbol];

            if position == 0 && entry_signals[symbol][i] {
                let px = config.buy_price(next);
                if px <= 0.0 {
                    continue;
                }
                let target_dollars = total_equity_before * weight * utilization;
                let desired = (target_dollars / px).floor() as i64;
                let max_afford = (cash / px).floor() as i64;
                let qty = desired.min(max_afford);
                if qty > 0 {
                    let gross = qty as f64 * px;
                    let fee = gross * fee_in;
                    if gross + fee <= cash {
                        cash -= gross + fee;
                        positions.insert(symbol, qty);
                        cost_basis.insert(symbol, px);
                        entry_fees.insert(symbol, fee);
                        entries += 1;
                        fills.push(PortfolioFill {
                            date: next.date,
                            symbol: spec.symbol.clone(),
                            side: Side::Buy,
                            price: px,
                            quantity: qty,
                            fee,
                            pnl: None,
                        });
                    }
                }
            } else if position > 0 && exit_signals[symbol][i] {
                let px = config.sell_price(next);
                let gross = position as f64 * px;
                let fee = gross * fee_out;
                cash += gross - fee;
                let pnl =
                    (px - cost_basis[symbol]) * position as f64 - fee - entry_fees[symbol];
                round_trip_pnls.push(pnl);
                exits += 1;
                fills.push(PortfolioFill {
                    date: next.date,
                    symbol: spec.symbol.clone(),
                    side: Side::Sell,
                    price: px,
                    quantity: position,
                    fee,
                    pnl: Some(pnl),
                });
                positions.insert(symbol, 0);
                cost_basis.insert(symbol, 0.0);
                entry_fees.insert(symbol, 0.0);
            }
        }

        let holdings_after: f64 = specs
            .iter()
            .map(|s| positions[s.symbol.as_str()] as f64 * aligned[&s.symbol][i + 1].close)
            .sum();
        equity.push(EquityPoint {
            date: dates[i + 1],
            value: cash + holdings_after,
        });
        for spec in specs {
            let exposure =
                positions[spec.symbol.as_str()] as f64 * aligned[&spec.symbol][i + 1].close;
            if let Some(curve) = per_symbol_equity.get_mut(&spec.symbol) {
                curve.push(EquityPoint {
                    date: dates[i + 1],
                    value: exposure,
                });
            }
        }
    }

    // buy-and-hold baseline over the same aligned window
    let closes: BTreeMap<String, Vec<f64>> = aligned
        .iter()
        .filter(|(symbol, _)| specs.iter().any(|s| &s.symbol == *symbol))
        .map(|(symbol, bars)| (symbol.clone(), bars.iter().map(|b| b.close).collect()))
        .collect();
    let buyhold_equity =
        weighted_buy_hold_equity(&dates, &closes, weights, utilization, init_cap);

    // benchmark baseline: single symbol, weight 1, forward-filled onto the
    // aligned window
    let benchmark_equity = benchmark_bars.map(|bars| {
        let curve: Vec<EquityPoint> = bars
            .iter()
            .map(|b| EquityPoint {
                date: b.date,
                value: b.close,
            })
            .collect();
        let aligned_closes = crate::domain::metrics::align_to_dates(&dates, &curve);
        let pairs: Vec<(NaiveDate, f64)> =
            aligned_closes.iter().map(|p| (p.date, p.value)).collect();
        buy_hold_equity(&pairs, init_cap)
    });

    let stats = TradeStats::from_round_trips(&round_trip_pnls, entries, exits);

    Ok(PortfolioResult {
        equity,
        per_symbol_equity,
        fills,
        stats,
        buyhold_equity,
        benchmark_equity,
    })
}
