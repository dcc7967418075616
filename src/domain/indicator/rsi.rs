//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! Edge cases: both averages zero => 50, only gains => 100, only losses => 0.
//!
//! Warmup: the first n bars are invalid (n price changes are needed for the
//! initial average).

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn calculate_rsi(bars: &[Bar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let dates: Vec<_> = bars.iter().map(|b| b.date).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values: rsi_points(&closes, &dates, period),
    }
}

pub(crate) fn rsi_points(
    closes: &[f64],
    dates: &[chrono::NaiveDate],
    period: usize,
) -> Vec<IndicatorPoint> {
    let invalid = |date| IndicatorPoint {
        date,
        valid: false,
        value: IndicatorValue::Simple(0.0),
    };

    if period == 0 || closes.len() < 2 {
        return dates.iter().map(|&d| invalid(d)).collect();
    }

    let mut values = Vec::with_capacity(closes.len());
    values.push(invalid(dates[0]));

    let mut gains: Vec<f64> = Vec::with_capacity(closes.len() - 1);
    let mut losses: Vec<f64> = Vec::with_capacity(closes.len() - 1);
    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..closes.len() {
        let change_idx = i - 1;

        if change_idx < period - 1 {
            values.push(invalid(dates[i]));
        } else if change_idx == period - 1 {
            avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
            avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
            values.push(IndicatorPoint {
                date: dates[i],
                valid: true,
                value: IndicatorValue::Simple(rsi_from_averages(avg_gain, avg_loss)),
            });
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gains[change_idx]) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + losses[change_idx]) / period as f64;
            values.push(IndicatorPoint {
                date: dates[i],
                valid: true,
                value: IndicatorValue::Simple(rsi_from_averages(avg_gain, avg_loss)),
            });
        }
    }

    values
}
