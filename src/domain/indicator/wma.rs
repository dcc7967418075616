//! Weighted Moving Average indicator.
//!
//! O(n) sliding window implementation:
//! WMA(n) = (1*V[i-n+1] + 2*V[i-n+2] + ... + n*V[i]) / (n*(n+1)/2)
//! Warmup: first (n-1) bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_wma(bars: &[Bar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let dates: Vec<_> = bars.iter().map(|b| b.date).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::Wma(period),
        values: wma_points(&closes, &dates, period),
    }
}

/// WMA over an arbitrary value series; HMA builds on this. Leading NaN
/// entries defer the window start; the fast sliding recurrence only kicks in
/// once the window holds defined values.
pub(crate) fn wma_points(
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
    let divisor = (period * (period + 1)) as f64 / 2.0;
    let mut weighted_sum: f64 = 0.0;
    let mut window_sum: f64 = 0.0;

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

        if offset < period {
            let weight = (offset + 1) as f64;
            weighted_sum += weight * v;
            window_sum += v;
        } else {
            weighted_sum += period as f64 * v - window_sum;
            window_sum += v - values[i - period];
        }

        let valid = offset >= period - 1;
        let wma = if valid { weighted_sum / divisor } else { 0.0 };

        out.push(IndicatorPoint {
            date: dates[i],
            valid,
            value: IndicatorValue::Simple(wma),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<Bar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn wma_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_wma(&bars, 3);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn wma_basic_calculation() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_wma(&bars, 3);

        if let IndicatorValue::Simple(v) = series.values[2].value {
            let divisor = (3.0 * 4.0) / 2.0;
            let expected = (1.0 * 10.0 + 2.0 * 20.0 + 3.0 * 30.0) / divisor;
            assert!((v - expected).abs() < f64::EPSILON);
        } else {
            panic!("Expected Simple value");
        }
    }

    #[test]
    fn wma_sliding_window() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_wma(&bars, 3);

        let divisor = (3.0 * 4.0) / 2.0;

        if let IndicatorValue::Simple(v) = series.values[3].value {
            let expected = (1.0 * 20.0 + 2.0 * 30.0 + 3.0 * 40.0) / divisor;
            assert!((v - expected).abs() < f64::EPSILON);
        }

        if let IndicatorValue::Simple(v) = series.values[4].value {
            let expected = (1.0 * 30.0 + 2.0 * 40.0 + 3.0 * 50.0) / divisor;
            assert!((v - expected).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn wma_period_1() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_wma(&bars, 1);

        assert!(series.values[0].valid);
        if let IndicatorValue::Simple(v) = series.values[1].value {
            assert!((v - 20.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn wma_equal_prices() {
        let bars = make_bars(&[100.0, 100.0, 100.0]);
        let series = calculate_wma(&bars, 3);

        if let IndicatorValue::Simple(v) = series.values[2].value {
            assert!((v - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn wma_over_series_with_leading_nan() {
        let dates: Vec<NaiveDate> = (1..=5)
            .map(|i| NaiveDate::from_ymd_opt(2024, 1, i).unwrap())
            .collect();
        let values = [f64::NAN, 10.0, 20.0, 30.0, 40.0];
        let points = wma_points(&values, &dates, 3);

        assert!(!points[0].valid);
        assert!(!points[1].valid);
        assert!(!points[2].valid);
        assert!(points[3].valid);

        let divisor = (3.0 * 4.0) / 2.0;
        if let IndicatorValue::Simple(v) = points[3].value {
            let expected = (1.0 * 10.0 + 2.0 * 20.0 + 3.0 * 30.0) / divisor;
            assert!((v - expected).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn wma_empty_bars() {
        let series = calculate_wma(&[], 3);
        assert!(series.values.is_empty());
    }

    #[test]
    fn wma_period_0() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_wma(&bars, 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
