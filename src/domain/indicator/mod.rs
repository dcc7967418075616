//! Technical indicator library.
//!
//! Indicator calculations are pure functions from a bar sequence to an
//! [`IndicatorSeries`] aligned 1:1 with the input bars. Points inside the
//! warm-up window carry `valid = false`; downstream consumers treat them as
//! undefined.
//!
//! - `IndicatorPoint`: a single point in an indicator time series
//! - `IndicatorValue`: enum for different indicator output shapes
//! - `IndicatorType`: indicator identity + parameters (serves as map key)
//! - `IndicatorSeries`: a time series of indicator values

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod hma;
pub mod keltner;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stoch_rsi;
pub mod wma;

use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;

use crate::domain::bar::Bar;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
    Band {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

/// Band multipliers are stored as hundredths so the type can stay `Eq + Hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Wma(usize),
    Hma(usize),
    Rsi(usize),
    Atr(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        mult_x100: u32,
    },
    Keltner {
        period: usize,
        mult_x100: u32,
    },
    StochRsi {
        rsi_period: usize,
        stoch_period: usize,
        k_smooth: usize,
        d_smooth: usize,
    },
    /// Bollinger bands computed over an RSI series rather than price.
    RsiBollinger {
        rsi_period: usize,
        bb_period: usize,
        mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mult(x100: u32) -> f64 {
            x100 as f64 / 100.0
        }
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Wma(period) => write!(f, "WMA({})", period),
            IndicatorType::Hma(period) => write!(f, "HMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger { period, mult_x100 } => {
                write!(f, "BOLLINGER({},{})", period, mult(*mult_x100))
            }
            IndicatorType::Keltner { period, mult_x100 } => {
                write!(f, "KELTNER({},{})", period, mult(*mult_x100))
            }
            IndicatorType::StochRsi {
                rsi_period,
                stoch_period,
                k_smooth,
                d_smooth,
            } => write!(
                f,
                "STOCH_RSI({},{},{},{})",
                rsi_period, stoch_period, k_smooth, d_smooth
            ),
            IndicatorType::RsiBollinger {
                rsi_period,
                bb_period,
                mult_x100,
            } => write!(f, "RSI_BB({},{},{})", rsi_period, bb_period, mult(*mult_x100)),
        }
    }
}

/// Compute every indicator in `types` over `bars`. Duplicate entries are
/// computed once.
pub fn compute_indicators(
    bars: &[Bar],
    types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut out = HashMap::new();
    for ty in types {
        if out.contains_key(ty) {
            continue;
        }
        let series = match *ty {
            IndicatorType::Sma(period) => sma::calculate_sma(bars, period),
            IndicatorType::Ema(period) => ema::calculate_ema(bars, period),
            IndicatorType::Wma(period) => wma::calculate_wma(bars, period),
            IndicatorType::Hma(period) => hma::calculate_hma(bars, period),
            IndicatorType::Rsi(period) => rsi::calculate_rsi(bars, period),
            IndicatorType::Atr(period) => atr::calculate_atr(bars, period),
            IndicatorType::Macd { fast, slow, signal } => {
                macd::calculate_macd(bars, fast, slow, signal)
            }
            IndicatorType::Bollinger { period, mult_x100 } => {
                bollinger::calculate_bollinger(bars, period, mult_x100 as f64 / 100.0)
            }
            IndicatorType::Keltner { period, mult_x100 } => {
                keltner::calculate_keltner(bars, period, mult_x100 as f64 / 100.0)
            }
            IndicatorType::StochRsi {
                rsi_period,
                stoch_period,
                k_smooth,
                d_smooth,
            } => stoch_rsi::calculate_stoch_rsi(bars, rsi_period, stoch_period, k_smooth, d_smooth),
            IndicatorType::RsiBollinger {
                rsi_period,
                bb_period,
                mult_x100,
            } => bollinger::calculate_rsi_bollinger(
                bars,
                rsi_period,
                bb_period,
                mult_x100 as f64 / 100.0,
            ),
        };
        out.insert(*ty, series);
    }
    out
}
