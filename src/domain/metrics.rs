//! Performance metrics: equity-curve KPIs, CAPM regression, and
//! baseline comparison summaries.
//!
//! All statistics use sample variance (n-1 denominator). Degenerate inputs
//! (no returns, zero variance, zero tracking error) yield NaN rather than
//! an error or a division by zero.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::baseline::BaselineContext;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Metric inputs resolved once per run and passed by reference; core
/// functions never consult ambient configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricParams {
    pub initial_capital: f64,
    pub periods_per_year: f64,
    pub risk_free_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    pub end_cap: f64,
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub vol: f64,
    pub maxdd: f64,
    pub bars: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapmStats {
    /// Compound-annualized regression intercept:
    /// (1 + daily_intercept)^periods_per_year - 1.
    pub alpha: f64,
    pub beta: f64,
    pub r_squared: f64,
    pub tracking_error: f64,
    pub information_ratio: f64,
}

/// Trade-level aggregates shared by the single-instrument and portfolio
/// simulators. All three ratios are NaN when no round trip closed.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub entries: usize,
    pub exits: usize,
    pub win_rate: f64,
    pub net_win_rate: f64,
    pub avg_trade_pnl: f64,
}

impl TradeStats {
    pub fn from_round_trips(pnls: &[f64], entries: usize, exits: usize) -> Self {
        let closed = pnls.len();
        if closed == 0 {
            return TradeStats {
                entries,
                exits,
                win_rate: f64::NAN,
                net_win_rate: f64::NAN,
                avg_trade_pnl: f64::NAN,
            };
        }
        let wins = pnls.iter().filter(|&&p| p > 0.0).count();
        let losses = pnls.iter().filter(|&&p| p < 0.0).count();
        TradeStats {
            entries,
            exits,
            win_rate: wins as f64 / closed as f64,
            net_win_rate: (wins as f64 - losses as f64) / closed as f64,
            avg_trade_pnl: pnls.iter().sum::<f64>() / closed as f64,
        }
    }
}

fn simple_returns(curve: &[EquityPoint]) -> Vec<f64> {
    curve
        .windows(2)
        .map(|w| (w[1].value - w[0].value) / w[0].value)
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Largest peak-to-trough decline as a fraction of the running peak.
pub fn max_drawdown(curve: &[EquityPoint]) -> f64 {
    let mut run_max = f64::MIN;
    let mut max_dd = 0.0_f64;
    for point in curve {
        run_max = run_max.max(point.value);
        let dd = 1.0 - point.value / run_max.max(1e-12);
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

pub fn kpis_from_equity(curve: &[EquityPoint], params: &MetricParams) -> Kpis {
    let init_cap = params.initial_capital;
    let per_year = params.periods_per_year;
    let rf_daily = if per_year > 0.0 {
        params.risk_free_rate / per_year
    } else {
        0.0
    };

    let end_cap = curve.last().map(|p| p.value).unwrap_or(init_cap);
    let total_return = end_cap / init_cap - 1.0;
    let returns = simple_returns(curve);

    if returns.is_empty() {
        return Kpis {
            end_cap,
            total_return,
            cagr: f64::NAN,
            sharpe: f64::NAN,
            sortino: f64::NAN,
            vol: f64::NAN,
            maxdd: f64::NAN,
            bars: curve.len(),
        };
    }

    let years = returns.len() as f64 / per_year;
    let cagr = if years > 0.0 {
        (end_cap / init_cap).powf(1.0 / years) - 1.0
    } else {
        f64::NAN
    };

    let excess: Vec<f64> = returns.iter().map(|r| r - rf_daily).collect();
    let mu = mean(&excess);
    let sd = sample_std(&excess);
    // downside deviation: positive excess zeroed, sample std of the result
    let clamped: Vec<f64> = excess.iter().map(|&e| if e > 0.0 { 0.0 } else { e }).collect();
    let dsd = sample_std(&clamped);

    let sharpe = if sd > 0.0 {
        mu / sd * per_year.sqrt()
    } else {
        f64::NAN
    };
    let sortino = if dsd > 0.0 {
        mu / dsd * per_year.sqrt()
    } else {
        f64::NAN
    };
    let vol = sample_std(&returns) * per_year.sqrt();

    Kpis {
        end_cap,
        total_return,
        cagr,
        sharpe,
        sortino,
        vol,
        maxdd: max_drawdown(curve),
        bars: curve.len(),
    }
}

/// Forward-fill `source` onto `dates`. Dates before the source's first
/// point take the first value so the output always has `dates.len()`
/// points.
pub(crate) fn align_to_dates(dates: &[NaiveDate], source: &[EquityPoint]) -> Vec<EquityPoint> {
    let mut out = Vec::with_capacity(dates.len());
    let mut idx = 0usize;
    let mut last = source.first().map(|p| p.value).unwrap_or(f64::NAN);
    for &date in dates {
        while idx < source.len() && source[idx].date <= date {
            last = source[idx].value;
            idx += 1;
        }
        out.push(EquityPoint { date, value: last });
    }
    out
}

/// OLS regression of strategy excess returns on benchmark excess returns.
///
/// Both curves are aligned to the benchmark's dates (the strategy is
/// forward-filled, leading dates without strategy history are dropped).
pub fn calculate_capm(
    strategy: &[EquityPoint],
    benchmark: &[EquityPoint],
    params: &MetricParams,
) -> CapmStats {
    let nan = CapmStats {
        alpha: f64::NAN,
        beta: f64::NAN,
        r_squared: f64::NAN,
        tracking_error: f64::NAN,
        information_ratio: f64::NAN,
    };

    let first_strat = match strategy.first() {
        Some(p) => p.date,
        None => return nan,
    };

    let mut strat_vals = Vec::new();
    let mut bench_vals = Vec::new();
    let mut idx = 0usize;
    let mut last = f64::NAN;
    for point in benchmark {
        while idx < strategy.len() && strategy[idx].date <= point.date {
            last = strategy[idx].value;
            idx += 1;
        }
        if point.date < first_strat {
            continue;
        }
        strat_vals.push(last);
        bench_vals.push(point.value);
    }

    if strat_vals.len() < 3 {
        // fewer than two aligned returns
        return nan;
    }

    let per_year = params.periods_per_year;
    let rf_daily = if per_year > 0.0 {
        params.risk_free_rate / per_year
    } else {
        0.0
    };

    let strat_returns: Vec<f64> = strat_vals
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    let bench_returns: Vec<f64> = bench_vals
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();

    let y: Vec<f64> = strat_returns.iter().map(|r| r - rf_daily).collect();
    let x: Vec<f64> = bench_returns.iter().map(|r| r - rf_daily).collect();

    let x_mean = mean(&x);
    let y_mean = mean(&y);
    let var_x: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
    let cov: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(&xv, &yv)| (xv - x_mean) * (yv - y_mean))
        .sum();

    if var_x == 0.0 {
        return nan;
    }

    let beta = cov / var_x;
    let alpha_daily = y_mean - beta * x_mean;

    let ss_res: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(&xv, &yv)| {
            let fitted = alpha_daily + beta * xv;
            (yv - fitted).powi(2)
        })
        .sum();
    let ss_tot: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        f64::NAN
    };

    let diff: Vec<f64> = strat_returns
        .iter()
        .zip(bench_returns.iter())
        .map(|(&s, &b)| s - b)
        .collect();
    let diff_std = sample_std(&diff);
    let tracking_error = diff_std * per_year.sqrt();
    let information_ratio = if diff_std > 0.0 {
        mean(&diff) / diff_std * per_year.sqrt()
    } else {
        f64::NAN
    };

    CapmStats {
        alpha: (1.0 + alpha_daily).powf(per_year) - 1.0,
        beta,
        r_squared,
        tracking_error,
        information_ratio,
    }
}

fn insert_kpis(out: &mut BTreeMap<String, f64>, prefix: &str, kpis: &Kpis) {
    out.insert(format!("{prefix}total_return"), kpis.total_return);
    out.insert(format!("{prefix}cagr"), kpis.cagr);
    out.insert(format!("{prefix}sharpe"), kpis.sharpe);
    out.insert(format!("{prefix}sortino"), kpis.sortino);
    out.insert(format!("{prefix}vol"), kpis.vol);
    out.insert(format!("{prefix}maxdd"), kpis.maxdd);
}

/// Re-align each enabled baseline to the strategy's window and compute its
/// KPI set under `bench_` / `buyhold_` prefixes.
pub fn summarize_comparisons(
    strategy: &[EquityPoint],
    baselines: &BaselineContext,
    params: &MetricParams,
) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    if strategy.is_empty() {
        return out;
    }
    let dates: Vec<NaiveDate> = strategy.iter().map(|p| p.date).collect();

    if let Some(bench) = &baselines.benchmark {
        let aligned = align_to_dates(&dates, bench);
        insert_kpis(&mut out, "bench_", &kpis_from_equity(&aligned, params));
    }
    if let Some(bh) = &baselines.buyhold {
        let aligned = align_to_dates(&dates, bh);
        insert_kpis(&mut out, "buyhold_", &kpis_from_equity(&aligned, params));
    }
    out
}

/// Assemble the flat fixed-key metrics map consumed downstream.
pub fn metrics_report(
    kpis: &Kpis,
    trade_stats: &TradeStats,
    comparisons: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    insert_kpis(&mut out, "", kpis);
    out.insert("win_rate".to_string(), trade_stats.win_rate);
    out.insert("net_win_rate".to_string(), trade_stats.net_win_rate);
    out.insert("avg_trade_pnl".to_string(), trade_stats.avg_trade_pnl);
    out.insert(
        "trades_total".to_string(),
        (trade_stats.entries + trade_stats.exits) as f64,
    );
    out.insert("trades_entry".to_string(), trade_stats.entries as f64);
    out.insert("trades_exit".to_string(), trade_stats.exits as f64);
    for (k, v) in comparisons {
        out.insert(k.clone(), *v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::baseline::buy_hold_equity;

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                value: v,
            })
            .collect()
    }

    fn params(init: f64) -> MetricParams {
        MetricParams {
            initial_capital: init,
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
        }
    }

    #[test]
    fn maxdd_monotone_is_zero() {
        let c = curve(&[100.0, 101.0, 105.0, 110.0]);
        assert_eq!(max_drawdown(&c), 0.0);
    }

    #[test]
    fn maxdd_known_case() {
        let c = curve(&[100.0, 80.0, 120.0]);
        assert!((max_drawdown(&c) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn maxdd_trough_vs_prior_peak() {
        let c = curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        assert!((max_drawdown(&c) - (110.0 - 80.0) / 110.0).abs() < 1e-12);
    }

    #[test]
    fn total_return_uses_initial_capital() {
        let c = curve(&[100_000.0, 110_000.0]);
        let kpis = kpis_from_equity(&c, &params(100_000.0));
        assert!((kpis.total_return - 0.10).abs() < 1e-12);
        assert!((kpis.end_cap - 110_000.0).abs() < 1e-9);
        assert_eq!(kpis.bars, 2);
    }

    #[test]
    fn single_point_curve_is_degenerate() {
        let c = curve(&[100_000.0]);
        let kpis = kpis_from_equity(&c, &params(100_000.0));
        assert!((kpis.total_return - 0.0).abs() < 1e-12);
        assert!(kpis.cagr.is_nan());
        assert!(kpis.sharpe.is_nan());
        assert!(kpis.sortino.is_nan());
        assert!(kpis.vol.is_nan());
        assert!(kpis.maxdd.is_nan());
    }

    #[test]
    fn flat_curve_zero_variance_gives_nan_sharpe() {
        let c = curve(&[100_000.0; 10]);
        let kpis = kpis_from_equity(&c, &params(100_000.0));
        assert!((kpis.total_return - 0.0).abs() < 1e-12);
        assert!((kpis.cagr - 0.0).abs() < 1e-12);
        assert!(kpis.sharpe.is_nan());
        assert!((kpis.vol - 0.0).abs() < 1e-12);
        assert_eq!(kpis.maxdd, 0.0);
    }

    #[test]
    fn cagr_one_year_doubles() {
        // 253 points = 252 returns = exactly one year
        let mut values = vec![100.0];
        let growth = 2.0_f64.powf(1.0 / 252.0);
        for i in 1..253 {
            values.push(100.0 * growth.powi(i));
        }
        let c = curve(&values);
        let kpis = kpis_from_equity(&c, &params(100.0));
        assert!((kpis.cagr - 1.0).abs() < 1e-9);
        assert!((kpis.total_return - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sharpe_positive_for_steady_gains() {
        let mut values = vec![100_000.0];
        for i in 1..100 {
            values.push(100_000.0 * (1.0 + 0.001 * i as f64));
        }
        let kpis = kpis_from_equity(&curve(&values), &params(100_000.0));
        assert!(kpis.sharpe > 0.0);
        assert!(kpis.vol > 0.0);
    }

    #[test]
    fn sortino_ignores_upside_only_volatility() {
        // gains and losses: sortino denominator only sees the losses
        let values = [100.0, 102.0, 101.0, 104.0, 102.5, 106.0];
        let kpis = kpis_from_equity(&curve(&values), &params(100.0));
        assert!(kpis.sharpe.is_finite());
        assert!(kpis.sortino.is_finite());
        assert!(kpis.sortino > kpis.sharpe);
    }

    #[test]
    fn trade_stats_no_round_trips_nan() {
        let stats = TradeStats::from_round_trips(&[], 0, 0);
        assert!(stats.win_rate.is_nan());
        assert!(stats.net_win_rate.is_nan());
        assert!(stats.avg_trade_pnl.is_nan());
    }

    #[test]
    fn trade_stats_win_and_net_rates() {
        let stats = TradeStats::from_round_trips(&[50.0, -20.0, 30.0, 0.0], 4, 4);
        assert!((stats.win_rate - 0.5).abs() < 1e-12);
        assert!((stats.net_win_rate - 0.25).abs() < 1e-12);
        assert!((stats.avg_trade_pnl - 15.0).abs() < 1e-12);
    }

    #[test]
    fn capm_self_regression_identity() {
        let values: Vec<f64> = (0..60)
            .map(|i| 100.0 * (1.0 + 0.01 * (i as f64 * 0.7).sin()))
            .collect();
        let c = curve(&values);
        let stats = calculate_capm(&c, &c, &params(100.0));

        assert!((stats.beta - 1.0).abs() < 1e-9);
        assert!(stats.alpha.abs() < 1e-9);
        assert!((stats.r_squared - 1.0).abs() < 1e-9);
        assert!((stats.tracking_error - 0.0).abs() < 1e-12);
        assert!(stats.information_ratio.is_nan());
    }

    #[test]
    fn capm_double_beta() {
        // strategy daily returns exactly 2x the benchmark's
        let mut bench = vec![100.0];
        let mut strat = vec![100.0];
        for i in 1..80 {
            let r = 0.01 * (i as f64 * 0.9).sin();
            bench.push(bench[i - 1] * (1.0 + r));
            strat.push(strat[i - 1] * (1.0 + 2.0 * r));
        }
        let stats = calculate_capm(&curve(&strat), &curve(&bench), &params(100.0));
        assert!((stats.beta - 2.0).abs() < 1e-9);
        assert!((stats.r_squared - 1.0).abs() < 1e-9);
        assert!(stats.tracking_error > 0.0);
    }

    #[test]
    fn capm_alpha_compound_annualized() {
        // benchmark flat-ish with variance, strategy adds 10bp per day
        let mut bench = vec![100.0];
        let mut strat = vec![100.0];
        for i in 1..80 {
            let r = 0.005 * if i % 2 == 0 { 1.0 } else { -1.0 };
            bench.push(bench[i - 1] * (1.0 + r));
            strat.push(strat[i - 1] * (1.0 + r + 0.001));
        }
        let stats = calculate_capm(&curve(&strat), &curve(&bench), &params(100.0));
        assert!((stats.beta - 1.0).abs() < 1e-6);
        let expected_alpha = 1.001_f64.powf(252.0) - 1.0;
        assert!((stats.alpha - expected_alpha).abs() < 1e-6);
    }

    #[test]
    fn capm_too_short_is_nan() {
        let c = curve(&[100.0, 101.0]);
        let stats = calculate_capm(&c, &c, &params(100.0));
        assert!(stats.beta.is_nan());
        assert!(stats.alpha.is_nan());
    }

    #[test]
    fn align_forward_fills_gaps() {
        let source = vec![
            EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                value: 100.0,
            },
            EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                value: 110.0,
            },
        ];
        let dates = [
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
        ];
        let aligned = align_to_dates(&dates, &source);
        let values: Vec<f64> = aligned.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![100.0, 100.0, 110.0, 110.0]);
    }

    #[test]
    fn summarize_comparisons_prefixes_keys() {
        let strat = curve(&[100.0, 102.0, 104.0]);
        let bh = buy_hold_equity(
            &strat.iter().map(|p| (p.date, p.value)).collect::<Vec<_>>(),
            100.0,
        );
        let baselines = BaselineContext {
            benchmark: Some(strat.clone()),
            buyhold: Some(bh),
        };
        let out = summarize_comparisons(&strat, &baselines, &params(100.0));

        assert!(out.contains_key("bench_total_return"));
        assert!(out.contains_key("bench_maxdd"));
        assert!(out.contains_key("buyhold_sharpe"));
        assert!((out["bench_total_return"] - 0.04).abs() < 1e-12);
    }

    #[test]
    fn metrics_report_fixed_keys() {
        let kpis = kpis_from_equity(&curve(&[100.0, 105.0, 103.0]), &params(100.0));
        let stats = TradeStats::from_round_trips(&[5.0], 1, 1);
        let report = metrics_report(&kpis, &stats, &BTreeMap::new());

        for key in [
            "total_return",
            "cagr",
            "sharpe",
            "sortino",
            "vol",
            "maxdd",
            "win_rate",
            "net_win_rate",
            "avg_trade_pnl",
            "trades_total",
            "trades_entry",
            "trades_exit",
        ] {
            assert!(report.contains_key(key), "missing key {}", key);
        }
        assert!((report["trades_total"] - 2.0).abs() < 1e-12);
        assert!((report["win_rate"] - 1.0).abs() < 1e-12);
    }
}
