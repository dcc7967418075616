//! Single-instrument trade simulator.
//!
//! Flat/Long state machine over precomputed entry/exit signals. The
//! decision at bar i uses only values computed through bar i; the fill
//! happens at bar i+1's open or close, so no trade ever executes on the
//! bar that produced its signal. Equity marks to each bar's close and the
//! curve has exactly one point per bar.

use chrono::NaiveDate;

use crate::domain::error::GridtraderError;
use crate::domain::bar::Bar;
use crate::domain::metrics::{EquityPoint, TradeStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    /// Fill at the next bar's open (market-on-open).
    OpenNextBar,
    /// Fill at the next bar's close (market-on-close).
    CloseNextBar,
}

impl OrderType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open_next_bar" | "moo" => Some(OrderType::OpenNextBar),
            "close_next_bar" | "moc" => Some(OrderType::CloseNextBar),
            _ => None,
        }
    }
}

/// Execution and cost model, resolved once before any simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub order_type: OrderType,
    pub initial_capital: f64,
    pub entry_fee_bps: f64,
    pub exit_fee_bps: f64,
    pub entry_slippage_bps: f64,
    pub exit_slippage_bps: f64,
    /// Fraction of cash targeted on entry.
    pub target_weight: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            order_type: OrderType::CloseNextBar,
            initial_capital: 100_000.0,
            entry_fee_bps: 0.0,
            exit_fee_bps: 0.0,
            entry_slippage_bps: 0.0,
            exit_slippage_bps: 0.0,
            target_weight: 1.0,
        }
    }
}

impl ExecutionConfig {
    /// Buy fill price at bar: slippage worsens the price upward.
    pub fn buy_price(&self, bar: &Bar) -> f64 {
        self.base_price(bar) * (1.0 + self.entry_slippage_bps / 1e4)
    }

    /// Sell fill price at bar: slippage worsens the price downward.
    pub fn sell_price(&self, bar: &Bar) -> f64 {
        self.base_price(bar) * (1.0 - self.exit_slippage_bps / 1e4)
    }

    fn base_price(&self, bar: &Bar) -> f64 {
        match self.order_type {
            OrderType::OpenNextBar => bar.open,
            OrderType::CloseNextBar => bar.close,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// A single fill event.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub date: NaiveDate,
    pub side: Side,
    pub price: f64,
    pub quantity: i64,
    pub fee: f64,
}

/// A completed entry/exit round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: i64,
    pub fees: f64,
    pub pnl: f64,
}

#[derive(Debug, Clone)]
pub struct SimResult {
    pub equity: Vec<EquityPoint>,
    pub fills: Vec<Fill>,
    pub trades: Vec<ClosedTrade>,
    pub stats: TradeStats,
}

pub fn run_simulation(
    bars: &[Bar],
    entry_signal: &[bool],
    exit_signal: &[bool],
    config: &ExecutionConfig,
) -> Result<SimResult, GridtraderError> {
    if bars.is_empty() {
        return Err(GridtraderError::EmptyBars);
    }
    if entry_signal.len() != bars.len() || exit_signal.len() != bars.len() {
        return Err(GridtraderError::SignalLengthMismatch {
            signal_len: entry_signal.len().min(exit_signal.len()),
            bar_count: bars.len(),
        });
    }

    let fee_in = config.entry_fee_bps / 1e4;
    let fee_out = config.exit_fee_bps / 1e4;

    let mut cash = config.initial_capital;
    let mut shares: i64 = 0;
    let mut entries = 0usize;
    let mut exits = 0usize;
    let mut fills: Vec<Fill> = Vec::new();
    let mut trades: Vec<ClosedTrade> = Vec::new();
    let mut round_trip_pnls: Vec<f64> = Vec::new();

    let mut entry_price = 0.0;
    let mut entry_date = bars[0].date;
    let mut entry_fee = 0.0;

    let mut equity = Vec::with_capacity(bars.len());
    equity.push(EquityPoint {
        date: bars[0].date,
        value: cash,
    });

    for i in 0..bars.len() - 1 {
        let next = &bars[i + 1];

        if shares == 0 && entry_signal[i] {
            let px = config.buy_price(next);
            let target_dollars = config.target_weight * cash;
            let affordable = (cash / (px * (1.0 + fee_in))).floor() as i64;
            let target_qty = (target_dollars / px).floor() as i64;
            let qty = affordable.min(target_qty).max(0);
            if qty > 0 {
                let notional = qty as f64 * px;
                let fee = fee_in * notional;
                cash -= notional + fee;
                shares = qty;
                entries += 1;
                entry_price = px;
                entry_date = next.date;
                entry_fee = fee;
                fills.push(Fill {
                    date: next.date,
                    side: Side::Buy,
                    price: px,
                    quantity: qty,
                    fee,
                });
            }
        } else if shares > 0 && exit_signal[i] {
            let px = config.sell_price(next);
            let notional = shares as f64 * px;
            let fee = fee_out * notional;
            cash += notional - fee;

            let fees = entry_fee + fee;
            let pnl = (px - entry_price) * shares as f64 - fees;
            round_trip_pnls.push(pnl);
            trades.push(ClosedTrade {
                entry_date,
                exit_date: next.date,
                entry_price,
                exit_price: px,
                quantity: shares,
                fees,
                pnl,
            });
            fills.push(Fill {
                date: next.date,
                side: Side::Sell,
                price: px,
                quantity: shares,
                fee,
            });
            shares = 0;
            exits += 1;
        }

        equity.push(EquityPoint {
            date: next.date,
            value: cash + shares as f64 * next.close,
        });
    }

    let stats = TradeStats::from_round_trips(&round_trip_pnls, entries, exits);

    Ok(SimResult {
        equity,
        fills,
        trades,
        stats,
    })
}
