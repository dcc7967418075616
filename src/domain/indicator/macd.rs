//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! line = EMA(fast) - EMA(slow); signal = EMA(line, signal_period);
//! histogram = line - signal. A point is valid once the signal line is
//! defined (slow + signal - 2 bars of warm-up).

use crate::domain::bar::Bar;
use crate::domain::indicator::ema::ema_points;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_macd(bars: &[Bar], fast: usize, slow: usize, signal: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let dates: Vec<_> = bars.iter().map(|b| b.date).collect();

    let ema_fast = ema_points(&closes, &dates, fast);
    let ema_slow = ema_points(&closes, &dates, slow);

    let line: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| match (f.valid && s.valid, &f.value, &s.value) {
            (true, IndicatorValue::Simple(fv), IndicatorValue::Simple(sv)) => fv - sv,
            _ => f64::NAN,
        })
        .collect();

    let signal_line = ema_points(&line, &dates, signal);

    let values = line
        .iter()
        .zip(signal_line.iter())
        .enumerate()
        .map(|(i, (&l, s))| match (s.valid && !l.is_nan(), &s.value) {
            (true, IndicatorValue::Simple(sv)) => IndicatorPoint {
                date: dates[i],
                valid: true,
                value: IndicatorValue::Macd {
                    line: l,
                    signal: *sv,
                    histogram: l - sv,
                },
            },
            _ => IndicatorPoint {
                date: dates[i],
                valid: false,
                value: IndicatorValue::Macd {
                    line: 0.0,
                    signal: 0.0,
                    histogram: 0.0,
                },
            },
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Macd { fast, slow, signal },
        values,
    }
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
    fn macd_warmup() {
        // slow=4 defined from index 3; signal=2 over the line defined from
        // index 4
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let series = calculate_macd(&bars, 2, 4, 2);

        for i in 0..4 {
            assert!(!series.values[i].valid, "index {} should be invalid", i);
        }
        assert!(series.values[4].valid);
        assert!(series.values[5].valid);
    }

    #[test]
    fn macd_constant_prices_zero() {
        let bars = make_bars(&[100.0; 10]);
        let series = calculate_macd(&bars, 2, 4, 2);

        for point in series.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = point.value
            {
                assert!(line.abs() < 1e-9);
                assert!(signal.abs() < 1e-9);
                assert!(histogram.abs() < 1e-9);
            }
        }
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let prices: Vec<f64> = (0..20)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 10.0)
            .collect();
        let bars = make_bars(&prices);
        let series = calculate_macd(&bars, 3, 6, 3);

        for point in series.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = point.value
            {
                assert!((histogram - (line - signal)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + 2.0 * i as f64).collect();
        let bars = make_bars(&prices);
        let series = calculate_macd(&bars, 3, 6, 3);

        let last = series.values.last().unwrap();
        assert!(last.valid);
        if let IndicatorValue::Macd { line, .. } = last.value {
            assert!(line > 0.0, "fast EMA should lead in an uptrend");
        }
    }

    #[test]
    fn macd_indicator_type() {
        let bars = make_bars(&[10.0, 20.0]);
        let series = calculate_macd(&bars, 12, 26, 9);
        assert_eq!(
            series.indicator_type,
            IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            }
        );
    }
}
