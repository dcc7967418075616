//! Hull Moving Average indicator.
//!
//! HMA(n) = WMA(sqrt(n)) applied to 2*WMA(n/2) - WMA(n).
//! Periods n/2 and sqrt(n) are truncated to integers.

use crate::domain::bar::Bar;
use crate::domain::indicator::wma::wma_points;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_hma(bars: &[Bar], period: usize) -> IndicatorSeries {
    let half_period = period / 2;
    let sqrt_period = (period as f64).sqrt() as usize;

    if period == 0 || half_period == 0 || sqrt_period == 0 {
        let values = bars
            .iter()
            .map(|b| IndicatorPoint {
                date: b.date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            })
            .collect();
        return IndicatorSeries {
            indicator_type: IndicatorType::Hma(period),
            values,
        };
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let dates: Vec<_> = bars.iter().map(|b| b.date).collect();

    let wma_half = wma_points(&closes, &dates, half_period);
    let wma_full = wma_points(&closes, &dates, period);

    let raw: Vec<f64> = wma_half
        .iter()
        .zip(wma_full.iter())
        .map(|(h, f)| match (h.valid, f.valid, &h.value, &f.value) {
            (true, true, IndicatorValue::Simple(hv), IndicatorValue::Simple(fv)) => {
                2.0 * hv - fv
            }
            _ => f64::NAN,
        })
        .collect();

    let values = wma_points(&raw, &dates, sqrt_period);

    IndicatorSeries {
        indicator_type: IndicatorType::Hma(period),
        values,
    }
}
