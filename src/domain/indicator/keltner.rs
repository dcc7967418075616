//! Keltner Channels indicator.
//!
//! middle = EMA(close, n), upper/lower = middle ± mult * ATR(n).
//! A point is valid once both the EMA and the ATR are out of warm-up.

use crate::domain::bar::Bar;
use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::ema::ema_points;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_keltner(bars: &[Bar], period: usize, mult: f64) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let dates: Vec<_> = bars.iter().map(|b| b.date).collect();

    let ema = ema_points(&closes, &dates, period);
    let atr = calculate_atr(bars, period);

    let values = ema
        .iter()
        .zip(atr.values.iter())
        .map(|(e, a)| {
            match (e.valid && a.valid, &e.value, &a.value) {
                (true, IndicatorValue::Simple(mid), IndicatorValue::Simple(range)) => {
                    IndicatorPoint {
                        date: e.date,
                        valid: true,
                        value: IndicatorValue::Band {
                            upper: mid + mult * range,
                            middle: *mid,
                            lower: mid - mult * range,
                        },
                    }
                }
                _ => IndicatorPoint {
                    date: e.date,
                    valid: false,
                    value: IndicatorValue::Band {
                        upper: 0.0,
                        middle: 0.0,
                        lower: 0.0,
                    },
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Keltner {
            period,
            mult_x100: (mult * 100.0).round() as u32,
        },
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn keltner_warmup() {
        let bars: Vec<Bar> = (0..5).map(|i| make_bar(i + 1, 110.0, 90.0, 100.0)).collect();
        let series = calculate_keltner(&bars, 3, 2.0);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
    }

    #[test]
    fn keltner_known_values() {
        // constant bars: EMA = close, ATR = high - low = 20
        let bars: Vec<Bar> = (0..5).map(|i| make_bar(i + 1, 110.0, 90.0, 100.0)).collect();
        let series = calculate_keltner(&bars, 3, 1.5);

        if let IndicatorValue::Band {
            upper,
            middle,
            lower,
        } = series.values[4].value
        {
            assert!((middle - 100.0).abs() < 1e-9);
            assert!((upper - 130.0).abs() < 1e-9);
            assert!((lower - 70.0).abs() < 1e-9);
        } else {
            panic!("Expected Band value");
        }
    }

    #[test]
    fn keltner_bands_symmetric() {
        let bars: Vec<Bar> = (0..8)
            .map(|i| {
                let c = 100.0 + i as f64;
                make_bar(i + 1, c + 5.0, c - 5.0, c)
            })
            .collect();
        let series = calculate_keltner(&bars, 3, 2.0);

        for point in series.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Band {
                upper,
                middle,
                lower,
            } = point.value
            {
                assert!((upper - middle - (middle - lower)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn keltner_indicator_type() {
        let bars = vec![make_bar(1, 110.0, 90.0, 100.0)];
        let series = calculate_keltner(&bars, 20, 2.0);
        assert_eq!(
            series.indicator_type,
            IndicatorType::Keltner {
                period: 20,
                mult_x100: 200
            }
        );
    }
}
