//! Simple Moving Average indicator.
//!
//! Rolling mean over a sliding window. Warmup: first (n-1) bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_sma(bars: &[Bar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let dates: Vec<_> = bars.iter().map(|b| b.date).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values: sma_points(&closes, &dates, period),
    }
}

/// SMA over an arbitrary value series (used for band middles and smoothing
/// derived series). NaN inputs inside the window invalidate the point.
pub(crate) fn sma_points(
    values: &[f64],
    dates: &[chrono::NaiveDate],
    period: usize,
) -> Vec<IndicatorPoint> {
    let mut out = Vec::with_capacity(values.len());
    if period == 0 {
        for &date in dates {
            out.push(IndicatorPoint {
                date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
        }
        return out;
    }

    for i in 0..values.len() {
        if i + 1 < period {
            out.push(IndicatorPoint {
                date: dates[i],
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
            continue;
        }
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            out.push(IndicatorPoint {
                date: dates[i],
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
        } else {
            let mean = window.iter().sum::<f64>() / period as f64;
            out.push(IndicatorPoint {
                date: dates[i],
                valid: true,
                value: IndicatorValue::Simple(mean),
            });
        }
    }
    out
}
