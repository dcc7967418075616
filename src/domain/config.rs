//! Run configuration: building validated, immutable config values from the
//! config port before any simulation starts.
//!
//! Core functions only ever see these structs; nothing reads configuration
//! ambiently at run time.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::error::GridtraderError;
use crate::domain::grid::GridSpec;
use crate::domain::metrics::MetricParams;
use crate::domain::simulator::{ExecutionConfig, OrderType};
use crate::ports::config_port::ConfigPort;

/// Everything a single-instrument or portfolio run needs, resolved once.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub execution: ExecutionConfig,
    pub metric_params: MetricParams,
}

/// Portfolio-mode settings.
#[derive(Debug, Clone)]
pub struct PortfolioSettings {
    pub symbols: Vec<String>,
    pub weights: Option<BTreeMap<String, f64>>,
    pub utilization: f64,
    pub benchmark: Option<String>,
}

fn invalid(section: &str, key: &str, reason: &str) -> GridtraderError {
    GridtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn missing(section: &str, key: &str) -> GridtraderError {
    GridtraderError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, GridtraderError> {
    let value = config
        .get_string("backtest", key)
        .ok_or_else(|| missing("backtest", key))?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|_| invalid("backtest", key, "invalid date format, expected YYYY-MM-DD"))
}

pub fn build_run_config(config: &dyn ConfigPort) -> Result<RunConfig, GridtraderError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;
    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }

    let initial_capital = config.get_double("backtest", "initial_capital", 100_000.0);
    if initial_capital <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let order_type_str = config
        .get_string("backtest", "order_type")
        .unwrap_or_else(|| "close_next_bar".to_string());
    let order_type = OrderType::parse(&order_type_str).ok_or_else(|| {
        invalid(
            "backtest",
            "order_type",
            "expected open_next_bar or close_next_bar",
        )
    })?;

    let entry_fee_bps = config.get_double("backtest", "entry_fee_bps", 0.0);
    let exit_fee_bps = config.get_double("backtest", "exit_fee_bps", 0.0);
    let entry_slippage_bps = config.get_double("backtest", "entry_slippage_bps", 0.0);
    let exit_slippage_bps = config.get_double("backtest", "exit_slippage_bps", 0.0);
    for (key, value) in [
        ("entry_fee_bps", entry_fee_bps),
        ("exit_fee_bps", exit_fee_bps),
        ("entry_slippage_bps", entry_slippage_bps),
        ("exit_slippage_bps", exit_slippage_bps),
    ] {
        if value < 0.0 {
            return Err(invalid("backtest", key, "must be non-negative"));
        }
    }

    let target_weight = config.get_double("backtest", "target_weight", 1.0);
    if target_weight <= 0.0 || target_weight > 1.0 {
        return Err(invalid(
            "backtest",
            "target_weight",
            "target_weight must be in (0, 1]",
        ));
    }

    let risk_free_rate = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    let periods_per_year = config.get_double("backtest", "periods_per_year", 252.0);
    if periods_per_year <= 0.0 {
        return Err(invalid(
            "backtest",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }

    Ok(RunConfig {
        start_date,
        end_date,
        execution: ExecutionConfig {
            order_type,
            initial_capital,
            entry_fee_bps,
            exit_fee_bps,
            entry_slippage_bps,
            exit_slippage_bps,
            target_weight,
        },
        metric_params: MetricParams {
            initial_capital,
            periods_per_year,
            risk_free_rate,
        },
    })
}

fn parse_usize_list(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Vec<usize>, GridtraderError> {
    match config.get_string(section, key) {
        None => Ok(Vec::new()),
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<usize>()
                    .map_err(|_| invalid(section, key, &format!("invalid integer '{}'", s)))
            })
            .collect(),
    }
}

fn parse_f64_list(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Vec<f64>, GridtraderError> {
    match config.get_string(section, key) {
        None => Ok(Vec::new()),
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>()
                    .map_err(|_| invalid(section, key, &format!("invalid number '{}'", s)))
            })
            .collect(),
    }
}

pub fn build_grid_spec(config: &dyn ConfigPort) -> Result<GridSpec, GridtraderError> {
    Ok(GridSpec {
        rsi_period: parse_usize_list(config, "strategy", "rsi_period")?,
        use_rsi_bb: config.get_bool("strategy", "use_rsi_bb", false),
        rsi_buy_below: parse_f64_list(config, "strategy", "rsi_buy_below")?,
        rsi_sell_above: parse_f64_list(config, "strategy", "rsi_sell_above")?,
        rsi_bb_period: parse_usize_list(config, "strategy", "rsi_bb_period")?,
        rsi_bb_std_dev: parse_f64_list(config, "strategy", "rsi_bb_std_dev")?,
    })
}

pub fn build_portfolio_settings(
    config: &dyn ConfigPort,
) -> Result<PortfolioSettings, GridtraderError> {
    let symbols_raw = config
        .get_string("portfolio", "symbols")
        .ok_or_else(|| missing("portfolio", "symbols"))?;
    let symbols: Vec<String> = symbols_raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if symbols.is_empty() {
        return Err(invalid("portfolio", "symbols", "no symbols configured"));
    }

    let weights = match config.get_string("portfolio", "weights") {
        None => None,
        Some(raw) => {
            let mut map = BTreeMap::new();
            for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let (symbol, value) = pair.split_once(':').ok_or_else(|| {
                    invalid("portfolio", "weights", "expected SYMBOL:weight pairs")
                })?;
                let weight = value.trim().parse::<f64>().map_err(|_| {
                    invalid(
                        "portfolio",
                        "weights",
                        &format!("invalid weight '{}'", value),
                    )
                })?;
                if weight < 0.0 {
                    return Err(invalid("portfolio", "weights", "weights must be non-negative"));
                }
                map.insert(symbol.trim().to_string(), weight);
            }
            Some(map)
        }
    };

    let utilization = config.get_double("portfolio", "utilization", 1.0);
    if utilization <= 0.0 || utilization > 1.0 {
        return Err(invalid(
            "portfolio",
            "utilization",
            "utilization must be in (0, 1]",
        ));
    }

    let benchmark = config
        .get_string("portfolio", "benchmark")
        .filter(|s| !s.trim().is_empty());

    Ok(PortfolioSettings {
        symbols,
        weights,
        utilization,
        benchmark,
    })
}

/// Per-symbol strategy parameters for portfolio mode: `[strategy.SYM]`
/// overrides fall back to `[strategy]` scalars.
pub fn instrument_thresholds(
    config: &dyn ConfigPort,
    symbol: &str,
) -> (usize, f64, f64) {
    let section = format!("strategy.{}", symbol);
    let fallback_period = config.get_int("strategy", "rsi_period", 14);
    let fallback_buy = config.get_double("strategy", "rsi_buy_below", 30.0);
    let fallback_sell = config.get_double("strategy", "rsi_sell_above", 70.0);

    let period = config.get_int(&section, "rsi_period", fallback_period).max(1) as usize;
    let buy = config.get_double(&section, "rsi_buy_below", fallback_buy);
    let sell = config.get_double(&section, "rsi_sell_above", fallback_sell);
    (period, buy, sell)
}
