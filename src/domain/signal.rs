//! Signal evaluation engine.
//!
//! Resolves typed series references against bars and precomputed
//! indicators, applies comparisons, and combines conditions into one
//! boolean signal per bar.
//!
//! # Evaluation Semantics
//!
//! - Warm-up (invalid) indicator points resolve to NaN; every comparison
//!   against NaN is false at that index.
//! - `crosses_above`/`crosses_below` compare the previous bar's ordering
//!   with the current bar's; index 0 is always false.
//! - `threshold_pct` applies to crossings only: the move past the target
//!   must be at least `target * threshold_pct / 100` at the crossing bar.
//! - `delay_bars` shifts each firing forward, clipped to the last bar.
//! - `Logic::All` ANDs conditions, `Logic::Any` ORs them; an empty
//!   condition list yields an all-false signal.

use std::collections::HashMap;

use crate::domain::bar::Bar;
use crate::domain::condition::{
    Comparison, Condition, IndicatorField, IndicatorRef, Logic, PriceField, SeriesRef,
};
use crate::domain::error::GridtraderError;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};

/// Absolute and relative tolerance for `equals` comparisons.
const EQ_ABS_TOL: f64 = 1e-8;
const EQ_REL_TOL: f64 = 1e-5;

pub fn evaluate_conditions(
    conditions: &[Condition],
    logic: Logic,
    bars: &[Bar],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
) -> Result<Vec<bool>, GridtraderError> {
    let n = bars.len();
    if conditions.is_empty() {
        return Ok(vec![false; n]);
    }

    let mut combined: Option<Vec<bool>> = None;
    for condition in conditions {
        let signal = evaluate_condition(condition, bars, indicators)?;
        combined = Some(match combined {
            None => signal,
            Some(acc) => acc
                .iter()
                .zip(signal.iter())
                .map(|(&a, &b)| match logic {
                    Logic::All => a && b,
                    Logic::Any => a || b,
                })
                .collect(),
        });
    }

    Ok(combined.unwrap_or_else(|| vec![false; n]))
}

pub fn evaluate_condition(
    condition: &Condition,
    bars: &[Bar],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
) -> Result<Vec<bool>, GridtraderError> {
    let source = resolve_series(&condition.source, bars, indicators)?;
    let target = resolve_series(&condition.target, bars, indicators)?;

    let raw = compare(&source, &target, condition.comparison, condition.threshold_pct);

    if condition.delay_bars == 0 {
        return Ok(raw);
    }
    Ok(apply_delay(&raw, condition.delay_bars))
}

fn resolve_series(
    series_ref: &SeriesRef,
    bars: &[Bar],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
) -> Result<Vec<f64>, GridtraderError> {
    match series_ref {
        SeriesRef::Constant(v) => Ok(vec![*v; bars.len()]),
        SeriesRef::Price(field) => Ok(bars
            .iter()
            .map(|b| match field {
                PriceField::Open => b.open,
                PriceField::High => b.high,
                PriceField::Low => b.low,
                PriceField::Close => b.close,
                PriceField::Volume => b.volume as f64,
            })
            .collect()),
        SeriesRef::Indicator(ind_ref) => resolve_indicator(ind_ref, indicators),
    }
}

fn resolve_indicator(
    ind_ref: &IndicatorRef,
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
) -> Result<Vec<f64>, GridtraderError> {
    let series = indicators.get(&ind_ref.indicator_type).ok_or_else(|| {
        GridtraderError::MissingIndicator {
            indicator: ind_ref.indicator_type.to_string(),
        }
    })?;

    Ok(series
        .values
        .iter()
        .map(|point| {
            if point.valid {
                extract_field(&point.value, ind_ref.field)
            } else {
                f64::NAN
            }
        })
        .collect())
}

fn extract_field(value: &IndicatorValue, field: IndicatorField) -> f64 {
    match (value, field) {
        (IndicatorValue::Simple(v), IndicatorField::Value) => *v,
        (IndicatorValue::Macd { line, .. }, IndicatorField::MacdLine) => *line,
        (IndicatorValue::Macd { signal, .. }, IndicatorField::MacdSignal) => *signal,
        (IndicatorValue::Macd { histogram, .. }, IndicatorField::MacdHistogram) => *histogram,
        (IndicatorValue::Stochastic { k, .. }, IndicatorField::StochK) => *k,
        (IndicatorValue::Stochastic { d, .. }, IndicatorField::StochD) => *d,
        (IndicatorValue::Band { upper, .. }, IndicatorField::Upper) => *upper,
        (IndicatorValue::Band { middle, .. }, IndicatorField::Middle) => *middle,
        (IndicatorValue::Band { lower, .. }, IndicatorField::Lower) => *lower,
        _ => f64::NAN,
    }
}

fn compare(
    source: &[f64],
    target: &[f64],
    comparison: Comparison,
    threshold_pct: Option<f64>,
) -> Vec<bool> {
    let n = source.len();
    let mut out = vec![false; n];

    match comparison {
        Comparison::Above => {
            for i in 0..n {
                out[i] = source[i] > target[i];
            }
        }
        Comparison::Below => {
            for i in 0..n {
                out[i] = source[i] < target[i];
            }
        }
        Comparison::AboveOrEqual => {
            for i in 0..n {
                out[i] = source[i] >= target[i];
            }
        }
        Comparison::BelowOrEqual => {
            for i in 0..n {
                out[i] = source[i] <= target[i];
            }
        }
        Comparison::Equals => {
            for i in 0..n {
                out[i] =
                    (source[i] - target[i]).abs() <= EQ_ABS_TOL + EQ_REL_TOL * target[i].abs();
            }
        }
        Comparison::CrossesAbove => {
            for i in 1..n {
                let defined = source[i].is_finite()
                    && source[i - 1].is_finite()
                    && target[i].is_finite()
                    && target[i - 1].is_finite();
                if !defined {
                    continue;
                }
                let crossed = source[i - 1] <= target[i - 1] && source[i] > target[i];
                out[i] = crossed && clears_threshold(source[i] - target[i], target[i], threshold_pct);
            }
        }
        Comparison::CrossesBelow => {
            for i in 1..n {
                let defined = source[i].is_finite()
                    && source[i - 1].is_finite()
                    && target[i].is_finite()
                    && target[i - 1].is_finite();
                if !defined {
                    continue;
                }
                let crossed = source[i - 1] >= target[i - 1] && source[i] < target[i];
                out[i] = crossed && clears_threshold(target[i] - source[i], target[i], threshold_pct);
            }
        }
    }

    out
}

fn clears_threshold(move_amount: f64, target: f64, threshold_pct: Option<f64>) -> bool {
    match threshold_pct {
        None => true,
        Some(pct) => move_amount >= target.abs() * pct / 100.0,
    }
}

fn apply_delay(signal: &[bool], delay_bars: usize) -> Vec<bool> {
    let n = signal.len();
    let mut out = vec![false; n];
    for (i, &fired) in signal.iter().enumerate() {
        if fired {
            out[(i + delay_bars).min(n.saturating_sub(1))] = true;
        }
    }
    out
}
