//! Bollinger Bands indicator.
//!
//! middle = SMA(n), upper/lower = middle ± mult * sample stddev over the
//! same window. Also computable over an arbitrary value series; the
//! RSI-Bollinger composition feeds the RSI series through the identical
//! band formula.

use crate::domain::bar::Bar;
use crate::domain::indicator::rsi::rsi_points;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_bollinger(bars: &[Bar], period: usize, mult: f64) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let dates: Vec<_> = bars.iter().map(|b| b.date).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            mult_x100: (mult * 100.0).round() as u32,
        },
        values: band_points(&closes, &dates, period, mult),
    }
}

/// Bollinger bands over the RSI series instead of price.
pub fn calculate_rsi_bollinger(
    bars: &[Bar],
    rsi_period: usize,
    bb_period: usize,
    mult: f64,
) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let dates: Vec<_> = bars.iter().map(|b| b.date).collect();

    let rsi: Vec<f64> = rsi_points(&closes, &dates, rsi_period)
        .iter()
        .map(|p| match (p.valid, &p.value) {
            (true, IndicatorValue::Simple(v)) => *v,
            _ => f64::NAN,
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::RsiBollinger {
            rsi_period,
            bb_period,
            mult_x100: (mult * 100.0).round() as u32,
        },
        values: band_points(&rsi, &dates, bb_period, mult),
    }
}

/// Band points over an arbitrary series. A window containing any NaN
/// (source warm-up) yields an invalid point. Stddev is the sample deviation
/// (n-1 denominator).
pub(crate) fn band_points(
    values: &[f64],
    dates: &[chrono::NaiveDate],
    period: usize,
    mult: f64,
) -> Vec<IndicatorPoint> {
    let invalid = |date| IndicatorPoint {
        date,
        valid: false,
        value: IndicatorValue::Band {
            upper: 0.0,
            middle: 0.0,
            lower: 0.0,
        },
    };

    let mut out = Vec::with_capacity(values.len());
    if period < 2 {
        return dates.iter().map(|&d| invalid(d)).collect();
    }

    for i in 0..values.len() {
        if i + 1 < period {
            out.push(invalid(dates[i]));
            continue;
        }
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            out.push(invalid(dates[i]));
            continue;
        }

        let mean = window.iter().sum::<f64>() / period as f64;
        let variance =
            window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
        let stddev = variance.sqrt();

        out.push(IndicatorPoint {
            date: dates[i],
            valid: true,
            value: IndicatorValue::Band {
                upper: mean + mult * stddev,
                middle: mean,
                lower: mean - mult * stddev,
            },
        });
    }
    out
}
