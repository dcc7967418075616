//! ATR (Average True Range) indicator.
//!
//! Wilder smoothing: seed = simple mean of the first n true ranges, then
//! ATR[i] = (ATR[i-1]*(n-1) + TR[i]) / n. The first bar's TR is high - low.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.is_empty() {
        let values = bars
            .iter()
            .map(|b| IndicatorPoint {
                date: b.date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            })
            .collect();
        return IndicatorSeries {
            indicator_type: IndicatorType::Atr(period),
            values,
        };
    }

    let mut tr_values: Vec<f64> = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let tr = if i == 0 {
            bar.high - bar.low
        } else {
            bar.true_range(bars[i - 1].close)
        };
        tr_values.push(tr);
    }

    let mut results: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut atr = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i + 1 < period {
            results.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            });
        } else if i + 1 == period {
            atr = tr_values[..period].iter().sum::<f64>() / period as f64;
            results.push(IndicatorPoint {
                date: bar.date,
                valid: true,
                value: IndicatorValue::Simple(atr),
            });
        } else {
            atr = (atr * (period - 1) as f64 + tr_values[i]) / period as f64;
            results.push(IndicatorPoint {
                date: bar.date,
                valid: true,
                value: IndicatorValue::Simple(atr),
            });
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values: results,
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
    fn atr_warmup() {
        let bars: Vec<Bar> = (0..5).map(|i| make_bar(i + 1, 110.0, 90.0, 100.0)).collect();
        let series = calculate_atr(&bars, 3);

        assert_eq!(series.values.len(), 5);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn atr_seed_is_average() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 115.0, 105.0, 110.0),
            make_bar(3, 120.0, 110.0, 115.0),
        ];

        let series = calculate_atr(&bars, 3);
        let seed = match &series.values[2].value {
            IndicatorValue::Simple(v) => *v,
            _ => 0.0,
        };

        let expected = (10.0 + 10.0 + 10.0) / 3.0;
        assert!((seed - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_wilder_smoothing() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 115.0, 105.0, 110.0),
            make_bar(3, 120.0, 110.0, 115.0),
            make_bar(4, 125.0, 115.0, 120.0),
        ];

        let series = calculate_atr(&bars, 3);
        let atr3 = match &series.values[3].value {
            IndicatorValue::Simple(v) => *v,
            _ => 0.0,
        };

        let seed = 10.0;
        let expected = (seed * 2.0 + 10.0) / 3.0;
        assert!((atr3 - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_gap_uses_true_range() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            // gap up: TR = |130 - 105| = 25, not high-low = 10
            make_bar(2, 130.0, 120.0, 125.0),
        ];

        let series = calculate_atr(&bars, 2);
        assert!(series.values[1].valid);
        if let IndicatorValue::Simple(v) = series.values[1].value {
            let expected = (10.0 + 25.0) / 2.0;
            assert!((v - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn atr_empty_bars() {
        let series = calculate_atr(&[], 5);
        assert!(series.values.is_empty());
    }

    #[test]
    fn atr_zero_period() {
        let bars = vec![make_bar(1, 110.0, 90.0, 100.0)];
        let series = calculate_atr(&bars, 0);
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
