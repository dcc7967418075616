//! Stochastic RSI indicator.
//!
//! stoch = (RSI - min(RSI, n)) / (max(RSI, n) - min(RSI, n)) * 100,
//! %K = SMA(stoch, k_smooth), %D = SMA(%K, d_smooth).
//! A flat min-max range yields the neutral value 50.
//! A point is valid once %D is defined.

use crate::domain::bar::Bar;
use crate::domain::indicator::rsi::rsi_points;
use crate::domain::indicator::sma::sma_points;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_stoch_rsi(
    bars: &[Bar],
    rsi_period: usize,
    stoch_period: usize,
    k_smooth: usize,
    d_smooth: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::StochRsi {
        rsi_period,
        stoch_period,
        k_smooth,
        d_smooth,
    };

    let invalid = |date| IndicatorPoint {
        date,
        valid: false,
        value: IndicatorValue::Stochastic { k: 0.0, d: 0.0 },
    };

    if stoch_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: bars.iter().map(|b| invalid(b.date)).collect(),
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let dates: Vec<_> = bars.iter().map(|b| b.date).collect();

    let rsi: Vec<f64> = rsi_points(&closes, &dates, rsi_period)
        .iter()
        .map(|p| match (p.valid, &p.value) {
            (true, IndicatorValue::Simple(v)) => *v,
            _ => f64::NAN,
        })
        .collect();

    // min-max normalize over the stochastic window
    let mut stoch: Vec<f64> = Vec::with_capacity(rsi.len());
    for i in 0..rsi.len() {
        if i + 1 < stoch_period {
            stoch.push(f64::NAN);
            continue;
        }
        let window = &rsi[i + 1 - stoch_period..=i];
        if window.iter().any(|v| v.is_nan()) {
            stoch.push(f64::NAN);
            continue;
        }
        let min = window.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if max - min == 0.0 {
            stoch.push(50.0);
        } else {
            stoch.push((rsi[i] - min) / (max - min) * 100.0);
        }
    }

    let k_line = sma_points(&stoch, &dates, k_smooth);
    let k_values: Vec<f64> = k_line
        .iter()
        .map(|p| match (p.valid, &p.value) {
            (true, IndicatorValue::Simple(v)) => *v,
            _ => f64::NAN,
        })
        .collect();
    let d_line = sma_points(&k_values, &dates, d_smooth);

    let values = k_values
        .iter()
        .zip(d_line.iter())
        .enumerate()
        .map(|(i, (&k, d))| match (d.valid && !k.is_nan(), &d.value) {
            (true, IndicatorValue::Simple(dv)) => IndicatorPoint {
                date: dates[i],
                valid: true,
                value: IndicatorValue::Stochastic { k, d: *dv },
            },
            _ => invalid(dates[i]),
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
