//! Typed condition model for entry/exit signals.
//!
//! A condition compares two resolvable series references. Every reference
//! is an enumerated kind (a constant, a price field, or an indicator
//! field), so unknown names are impossible after parsing; there is no
//! string lookup (and no silent fallback series) at evaluation time.

use crate::domain::indicator::IndicatorType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

/// Which output of a multi-value indicator a condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorField {
    Value,
    MacdLine,
    MacdSignal,
    MacdHistogram,
    StochK,
    StochD,
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorRef {
    pub indicator_type: IndicatorType,
    pub field: IndicatorField,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesRef {
    Constant(f64),
    Price(PriceField),
    Indicator(IndicatorRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Above,
    Below,
    AboveOrEqual,
    BelowOrEqual,
    Equals,
    CrossesAbove,
    CrossesBelow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub source: SeriesRef,
    pub comparison: Comparison,
    pub target: SeriesRef,
    /// Crossings must clear the target by this percentage of the target's
    /// value at the crossing bar.
    pub threshold_pct: Option<f64>,
    /// A signal firing at bar i becomes actionable at bar i + delay_bars,
    /// clipped to the sequence end.
    pub delay_bars: usize,
}

impl Condition {
    pub fn new(source: SeriesRef, comparison: Comparison, target: SeriesRef) -> Self {
        Condition {
            source,
            comparison,
            target,
            threshold_pct: None,
            delay_bars: 0,
        }
    }
}

/// How multiple conditions combine into one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    All,
    Any,
}

/// Collect the distinct indicator types referenced by a set of conditions,
/// in first-appearance order, for precomputation.
pub fn extract_indicators(conditions: &[Condition]) -> Vec<IndicatorType> {
    let mut out: Vec<IndicatorType> = Vec::new();
    let mut push = |r: &SeriesRef| {
        if let SeriesRef::Indicator(ind) = r {
            if !out.contains(&ind.indicator_type) {
                out.push(ind.indicator_type);
            }
        }
    };
    for cond in conditions {
        push(&cond.source);
        push(&cond.target);
    }
    out
}
