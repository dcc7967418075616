//! Strategy parameter grid expansion.
//!
//! List-valued parameters expand into the cartesian product of discrete
//! configurations. Iteration is nested in declared parameter order so the
//! grid output is reproducible; invalid combinations (entry threshold at or
//! above the exit threshold) are dropped and duplicates are emitted once.

use crate::domain::condition::{Comparison, Condition, IndicatorField, IndicatorRef, SeriesRef};
use crate::domain::indicator::IndicatorType;

/// List-valued grid parameters. Scalars are one-element lists; empty lists
/// take the defaults (period 14, thresholds 30/70, band 20 at 2.0).
#[derive(Debug, Clone, Default)]
pub struct GridSpec {
    pub rsi_period: Vec<usize>,
    pub use_rsi_bb: bool,
    pub rsi_buy_below: Vec<f64>,
    pub rsi_sell_above: Vec<f64>,
    pub rsi_bb_period: Vec<usize>,
    pub rsi_bb_std_dev: Vec<f64>,
}

/// One fully resolved strategy configuration from the grid.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyParams {
    FixedThreshold {
        rsi_period: usize,
        buy_below: f64,
        sell_above: f64,
    },
    RsiBollinger {
        rsi_period: usize,
        bb_period: usize,
        bb_std_dev: f64,
    },
}

impl StrategyParams {
    fn rsi_ref(period: usize) -> SeriesRef {
        SeriesRef::Indicator(IndicatorRef {
            indicator_type: IndicatorType::Rsi(period),
            field: IndicatorField::Value,
        })
    }

    fn band_ref(rsi_period: usize, bb_period: usize, bb_std_dev: f64, field: IndicatorField) -> SeriesRef {
        SeriesRef::Indicator(IndicatorRef {
            indicator_type: IndicatorType::RsiBollinger {
                rsi_period,
                bb_period,
                mult_x100: (bb_std_dev * 100.0).round() as u32,
            },
            field,
        })
    }

    /// Conditions that open a position.
    pub fn entry_conditions(&self) -> Vec<Condition> {
        match *self {
            StrategyParams::FixedThreshold {
                rsi_period,
                buy_below,
                ..
            } => vec![Condition::new(
                Self::rsi_ref(rsi_period),
                Comparison::Below,
                SeriesRef::Constant(buy_below),
            )],
            StrategyParams::RsiBollinger {
                rsi_period,
                bb_period,
                bb_std_dev,
            } => vec![Condition::new(
                Self::rsi_ref(rsi_period),
                Comparison::Below,
                Self::band_ref(rsi_period, bb_period, bb_std_dev, IndicatorField::Lower),
            )],
        }
    }

    /// Conditions that close a position.
    pub fn exit_conditions(&self) -> Vec<Condition> {
        match *self {
            StrategyParams::FixedThreshold {
                rsi_period,
                sell_above,
                ..
            } => vec![Condition::new(
                Self::rsi_ref(rsi_period),
                Comparison::Above,
                SeriesRef::Constant(sell_above),
            )],
            StrategyParams::RsiBollinger {
                rsi_period,
                bb_period,
                bb_std_dev,
            } => vec![Condition::new(
                Self::rsi_ref(rsi_period),
                Comparison::Above,
                Self::band_ref(rsi_period, bb_period, bb_std_dev, IndicatorField::Upper),
            )],
        }
    }

    /// Short display label for result tables.
    pub fn label(&self) -> String {
        match *self {
            StrategyParams::FixedThreshold {
                rsi_period,
                buy_below,
                sell_above,
            } => format!("rsi={} buy<{} sell>{}", rsi_period, buy_below, sell_above),
            StrategyParams::RsiBollinger {
                rsi_period,
                bb_period,
                bb_std_dev,
            } => format!("rsi={} bb={}x{}", rsi_period, bb_period, bb_std_dev),
        }
    }
}

fn or_default<T: Clone>(values: &[T], default: T) -> Vec<T> {
    if values.is_empty() {
        vec![default]
    } else {
        values.to_vec()
    }
}

/// Expand a grid spec into every valid parameter combination.
pub fn expand(spec: &GridSpec) -> Vec<StrategyParams> {
    let periods = or_default(&spec.rsi_period, 14);
    let mut out: Vec<StrategyParams> = Vec::new();

    if spec.use_rsi_bb {
        let bb_periods = or_default(&spec.rsi_bb_period, 20);
        let bb_stds = or_default(&spec.rsi_bb_std_dev, 2.0);
        for &rsi_period in &periods {
            for &bb_period in &bb_periods {
                for &bb_std_dev in &bb_stds {
                    let params = StrategyParams::RsiBollinger {
                        rsi_period,
                        bb_period,
                        bb_std_dev,
                    };
                    if !out.contains(&params) {
                        out.push(params);
                    }
                }
            }
        }
    } else {
        let buys = or_default(&spec.rsi_buy_below, 30.0);
        let sells = or_default(&spec.rsi_sell_above, 70.0);
        for &rsi_period in &periods {
            for &buy_below in &buys {
                for &sell_above in &sells {
                    if buy_below >= sell_above {
                        continue;
                    }
                    let params = StrategyParams::FixedThreshold {
                        rsi_period,
                        buy_below,
                        sell_above,
                    };
                    if !out.contains(&params) {
                        out.push(params);
                    }
                }
            }
        }
    }

    out
}
