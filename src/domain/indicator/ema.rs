//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = V[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_ema(bars: &[Bar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let dates: Vec<_> = bars.iter().map(|b| b.date).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values: ema_points(&closes, &dates, period),
    }
}

/// EMA over an arbitrary value series. Leading NaN entries (a derived
/// series' own warm-up) are skipped; the seed SMA starts at the first
/// defined value.
pub(crate) fn ema_points(
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

    let first_valid = values.iter().position(|v| !v.is_nan());
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, &v) in values.iter().enumerate() {
        let offset = match first_valid {
            Some(fv) if i >= fv => i - fv,
            _ => {
                out.push(IndicatorPoint {
                    date: dates[i],
                    valid: false,
                    value: IndicatorValue::Simple(0.0),
                });
                continue;
            }
        };

        if offset < period - 1 {
            sum += v;
            out.push(IndicatorPoint {
                date: dates[i],
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
        } else if offset == period - 1 {
            sum += v;
            ema = sum / period as f64;
            out.push(IndicatorPoint {
                date: dates[i],
                valid: true,
                value: IndicatorValue::Simple(ema),
            });
        } else {
            ema = v * k + ema * (1.0 - k);
            out.push(IndicatorPoint {
                date: dates[i],
                valid: true,
                value: IndicatorValue::Simple(ema),
            });
        }
    }
    out
}
