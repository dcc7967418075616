//! Per-parameter-set pipeline and parallel grid orchestration.
//!
//! A single (bars, parameter-set) unit runs indicator computation, signal
//! evaluation, simulation, and metrics in isolation and fails loudly. The
//! grid runner fans units out across a rayon worker pool; a failing unit is
//! logged and skipped so it never aborts its siblings, and results come
//! back in grid order.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::warn;

use crate::domain::bar::Bar;
use crate::domain::baseline::BaselineContext;
use crate::domain::condition::{extract_indicators, Condition, Logic};
use crate::domain::error::GridtraderError;
use crate::domain::grid::StrategyParams;
use crate::domain::indicator::compute_indicators;
use crate::domain::metrics::{
    kpis_from_equity, metrics_report, summarize_comparisons, MetricParams,
};
use crate::domain::signal::evaluate_conditions;
use crate::domain::simulator::{run_simulation, ExecutionConfig, SimResult};

#[derive(Debug, Clone)]
pub struct GridOutcome {
    /// Position in the expanded grid; results keep this order.
    pub index: usize,
    pub params: StrategyParams,
    pub result: SimResult,
    pub metrics: BTreeMap<String, f64>,
}

/// Evaluate a condition-driven strategy over one instrument's bars.
pub fn run_conditions(
    bars: &[Bar],
    entry_conditions: &[Condition],
    exit_conditions: &[Condition],
    entry_logic: Logic,
    exit_logic: Logic,
    config: &ExecutionConfig,
) -> Result<SimResult, GridtraderError> {
    let mut types = extract_indicators(entry_conditions);
    for ty in extract_indicators(exit_conditions) {
        if !types.contains(&ty) {
            types.push(ty);
        }
    }
    let indicators = compute_indicators(bars, &types);

    let entry_signal = evaluate_conditions(entry_conditions, entry_logic, bars, &indicators)?;
    let exit_signal = evaluate_conditions(exit_conditions, exit_logic, bars, &indicators)?;

    run_simulation(bars, &entry_signal, &exit_signal, config)
}

/// One grid unit: strategy conditions from the parameter set, then the
/// full pipeline, then the flat metrics map with baseline comparisons.
pub fn run_params(
    bars: &[Bar],
    index: usize,
    params: &StrategyParams,
    config: &ExecutionConfig,
    metric_params: &MetricParams,
    baselines: &BaselineContext,
) -> Result<GridOutcome, GridtraderError> {
    let result = run_conditions(
        bars,
        &params.entry_conditions(),
        &params.exit_conditions(),
        Logic::All,
        Logic::All,
        config,
    )?;

    let kpis = kpis_from_equity(&result.equity, metric_params);
    let comparisons = summarize_comparisons(&result.equity, baselines, metric_params);
    let metrics = metrics_report(&kpis, &result.stats, &comparisons);

    Ok(GridOutcome {
        index,
        params: params.clone(),
        result,
        metrics,
    })
}

/// Run every parameter set across the worker pool. Failures are isolated:
/// the offending set is logged and dropped, siblings keep running.
pub fn run_grid(
    bars: &[Bar],
    grid: &[StrategyParams],
    config: &ExecutionConfig,
    metric_params: &MetricParams,
    baselines: &BaselineContext,
) -> Vec<GridOutcome> {
    let mut outcomes: Vec<GridOutcome> = grid
        .par_iter()
        .enumerate()
        .filter_map(|(index, params)| {
            match run_params(bars, index, params, config, metric_params, baselines) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    warn!(params = %params.label(), error = %e, "grid unit failed, skipping");
                    None
                }
            }
        })
        .collect();

    outcomes.sort_by_key(|o| o.index);
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::baseline::buy_hold_equity_from_bars;
    use crate::domain::grid::{expand, GridSpec};
    use chrono::NaiveDate;

    fn make_bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 10_000,
            })
            .collect()
    }

    fn metric_params(init: f64) -> MetricParams {
        MetricParams {
            initial_capital: init,
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
        }
    }

    fn exec_config(init: f64) -> ExecutionConfig {
        ExecutionConfig {
            initial_capital: init,
            ..Default::default()
        }
    }

    #[test]
    fn run_params_end_to_end() {
        let bars = make_bars(&[50.0, 48.0, 45.0, 52.0, 58.0, 60.0]);
        let params = StrategyParams::FixedThreshold {
            rsi_period: 2,
            buy_below: 30.0,
            sell_above: 70.0,
        };
        let outcome = run_params(
            &bars,
            0,
            &params,
            &exec_config(1000.0),
            &metric_params(1000.0),
            &BaselineContext::default(),
        )
        .unwrap();

        assert_eq!(outcome.result.equity.len(), 6);
        assert!((outcome.metrics["total_return"] - 0.114).abs() < 1e-9);
        assert!((outcome.metrics["trades_entry"] - 1.0).abs() < 1e-12);
        assert!((outcome.metrics["trades_exit"] - 1.0).abs() < 1e-12);
        assert!((outcome.metrics["win_rate"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn run_grid_preserves_grid_order() {
        let bars = make_bars(&[
            50.0, 48.0, 45.0, 52.0, 58.0, 60.0, 55.0, 47.0, 44.0, 51.0, 57.0, 61.0,
        ]);
        let spec = GridSpec {
            rsi_period: vec![2, 3],
            rsi_buy_below: vec![25.0, 30.0],
            rsi_sell_above: vec![70.0],
            ..Default::default()
        };
        let grid = expand(&spec);
        let outcomes = run_grid(
            &bars,
            &grid,
            &exec_config(1000.0),
            &metric_params(1000.0),
            &BaselineContext::default(),
        );

        assert_eq!(outcomes.len(), grid.len());
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
            assert_eq!(outcome.params, grid[i]);
        }
    }

    #[test]
    fn run_grid_results_independent_of_parallelism() {
        // run the same grid twice; rayon scheduling must not leak into the
        // results
        let bars = make_bars(&[
            50.0, 48.0, 45.0, 52.0, 58.0, 60.0, 55.0, 47.0, 44.0, 51.0, 57.0, 61.0,
        ]);
        let spec = GridSpec {
            rsi_period: vec![2, 3, 4],
            rsi_buy_below: vec![25.0, 30.0, 35.0],
            rsi_sell_above: vec![65.0, 70.0],
            ..Default::default()
        };
        let grid = expand(&spec);

        let a = run_grid(
            &bars,
            &grid,
            &exec_config(1000.0),
            &metric_params(1000.0),
            &BaselineContext::default(),
        );
        let b = run_grid(
            &bars,
            &grid,
            &exec_config(1000.0),
            &metric_params(1000.0),
            &BaselineContext::default(),
        );

        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.params, y.params);
            assert_eq!(x.metrics["total_return"], y.metrics["total_return"]);
        }
    }

    #[test]
    fn run_grid_with_baselines_adds_prefixed_metrics() {
        let bars = make_bars(&[50.0, 48.0, 45.0, 52.0, 58.0, 60.0]);
        let baselines = BaselineContext {
            buyhold: Some(buy_hold_equity_from_bars(&bars, 1000.0)),
            benchmark: None,
        };
        let grid = vec![StrategyParams::FixedThreshold {
            rsi_period: 2,
            buy_below: 30.0,
            sell_above: 70.0,
        }];
        let outcomes = run_grid(
            &bars,
            &grid,
            &exec_config(1000.0),
            &metric_params(1000.0),
            &baselines,
        );

        let metrics = &outcomes[0].metrics;
        assert!(metrics.contains_key("buyhold_total_return"));
        // buy-and-hold over 50 -> 60 gains 20%
        assert!((metrics["buyhold_total_return"] - 0.2).abs() < 1e-9);
        assert!(!metrics.contains_key("bench_total_return"));
    }

    #[test]
    fn run_conditions_rejects_missing_data() {
        let result = run_conditions(
            &[],
            &[],
            &[],
            Logic::All,
            Logic::All,
            &exec_config(1000.0),
        );
        assert!(matches!(result, Err(GridtraderError::EmptyBars)));
    }
}
