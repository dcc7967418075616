//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::bar::{validate_bars, Bar};
use crate::domain::baseline::{buy_hold_equity_from_bars, BaselineContext};
use crate::domain::condition::{Condition, Logic};
use crate::domain::condition_parser::parse_conditions;
use crate::domain::config::{
    build_grid_spec, build_portfolio_settings, build_run_config, instrument_thresholds, RunConfig,
};
use crate::domain::error::GridtraderError;
use crate::domain::grid::{expand, StrategyParams};
use crate::domain::metrics::{kpis_from_equity, metrics_report, summarize_comparisons};
use crate::domain::portfolio::{normalize_weights, simulate_portfolio, InstrumentSpec};
use crate::domain::runner::{run_conditions, run_grid, GridOutcome};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "gridtrader", about = "Grid-searching strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single-instrument backtest (grid or condition strategy)
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a multi-instrument portfolio backtest
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the configured data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            output,
        } => run_backtest(&config, symbol.as_deref(), output.as_ref()),
        Command::Portfolio { config, output } => run_portfolio(&config, output.as_ref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
    }
}

fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = GridtraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn data_adapter(config: &dyn ConfigPort) -> Result<CsvAdapter, ExitCode> {
    match config.get_string("data", "csv_dir") {
        Some(dir) => Ok(CsvAdapter::new(PathBuf::from(dir))),
        None => {
            let err = GridtraderError::ConfigMissing {
                section: "data".into(),
                key: "csv_dir".into(),
            };
            eprintln!("error: {err}");
            Err(ExitCode::from(&err))
        }
    }
}

fn fetch_validated_bars(
    data_port: &dyn DataPort,
    symbol: &str,
    run_config: &RunConfig,
) -> Result<Vec<Bar>, GridtraderError> {
    let bars = data_port.fetch_bars(symbol, run_config.start_date, run_config.end_date)?;
    validate_bars(symbol, &bars)?;
    Ok(bars)
}

/// Entry/exit conditions from `[strategy]` DSL keys, when present.
fn condition_strategy(
    config: &dyn ConfigPort,
) -> Result<Option<(Vec<Condition>, Vec<Condition>, Logic, Logic)>, ExitCode> {
    let entry_text = config.get_string("strategy", "entry");
    let exit_text = config.get_string("strategy", "exit");
    let (entry_text, exit_text) = match (entry_text, exit_text) {
        (Some(e), Some(x)) => (e, x),
        (None, None) => return Ok(None),
        _ => {
            eprintln!("error: [strategy] entry and exit must be set together");
            return Err(ExitCode::from(2));
        }
    };

    let entry = parse_conditions(&entry_text).map_err(|e| {
        eprintln!(
            "error: failed to parse entry conditions:\n{}",
            e.display_with_context(&entry_text)
        );
        ExitCode::from(4)
    })?;
    let exit = parse_conditions(&exit_text).map_err(|e| {
        eprintln!(
            "error: failed to parse exit conditions:\n{}",
            e.display_with_context(&exit_text)
        );
        ExitCode::from(4)
    })?;

    Ok(Some((
        entry,
        exit,
        parse_logic(config, "entry_logic"),
        parse_logic(config, "exit_logic"),
    )))
}

fn parse_logic(config: &dyn ConfigPort, key: &str) -> Logic {
    match config
        .get_string("strategy", key)
        .unwrap_or_else(|| "all".to_string())
        .to_ascii_lowercase()
        .as_str()
    {
        "any" => Logic::Any,
        _ => Logic::All,
    }
}

fn build_baselines(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    bars: &[Bar],
    run_config: &RunConfig,
) -> BaselineContext {
    let buyhold = if config.get_bool("backtest", "buy_hold", true) {
        Some(buy_hold_equity_from_bars(
            bars,
            run_config.execution.initial_capital,
        ))
    } else {
        None
    };

    let benchmark = config
        .get_string("backtest", "benchmark")
        .filter(|s| !s.trim().is_empty())
        .and_then(|symbol| {
            match fetch_validated_bars(data_port, &symbol, run_config) {
                Ok(bench_bars) => Some(buy_hold_equity_from_bars(
                    &bench_bars,
                    run_config.execution.initial_capital,
                )),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "benchmark unavailable, skipping");
                    None
                }
            }
        });

    BaselineContext { buyhold, benchmark }
}

fn run_backtest(
    config_path: &PathBuf,
    symbol_override: Option<&str>,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let run_config = match build_run_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let symbol = match symbol_override
        .map(str::to_string)
        .or_else(|| adapter.get_string("backtest", "symbol"))
    {
        Some(s) => s,
        None => {
            eprintln!("error: no symbol configured ([backtest] symbol or --symbol)");
            return ExitCode::from(2);
        }
    };

    let data_port = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(code) => return code,
    };

    let bars = match fetch_validated_bars(&data_port, &symbol, &run_config) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    info!(symbol = %symbol, bars = bars.len(), "loaded bars");

    let baselines = build_baselines(&adapter, &data_port, &bars, &run_config);

    // condition strategy runs once; otherwise the grid runs
    match condition_strategy(&adapter) {
        Err(code) => code,
        Ok(Some((entry, exit, entry_logic, exit_logic))) => {
            let result = match run_conditions(
                &bars,
                &entry,
                &exit,
                entry_logic,
                exit_logic,
                &run_config.execution,
            ) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            };
            let kpis = kpis_from_equity(&result.equity, &run_config.metric_params);
            let comparisons =
                summarize_comparisons(&result.equity, &baselines, &run_config.metric_params);
            let metrics = metrics_report(&kpis, &result.stats, &comparisons);
            print_metrics(&symbol, &metrics);
            if let Some(path) = output_path {
                if let Err(e) = write_equity_csv(path, &result.equity) {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            }
            ExitCode::SUCCESS
        }
        Ok(None) => {
            let spec = match build_grid_spec(&adapter) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            };
            let grid = expand(&spec);
            if grid.is_empty() {
                eprintln!("error: grid expansion produced no valid parameter sets");
                return ExitCode::from(2);
            }
            info!(combinations = grid.len(), "expanded parameter grid");

            let outcomes = run_grid(
                &bars,
                &grid,
                &run_config.execution,
                &run_config.metric_params,
                &baselines,
            );
            if outcomes.is_empty() {
                eprintln!("error: every grid unit failed");
                return ExitCode::from(6);
            }
            print_grid(&symbol, &outcomes);
            if let Some(path) = output_path {
                if let Err(e) = write_grid_csv(path, &outcomes) {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            }
            ExitCode::SUCCESS
        }
    }
}

fn run_portfolio(config_path: &PathBuf, output_path: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let run_config = match build_run_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let settings = match build_portfolio_settings(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let data_port = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(code) => return code,
    };

    // a failing symbol is skipped, not fatal for the whole portfolio
    let mut data = BTreeMap::new();
    let mut specs: Vec<InstrumentSpec> = Vec::new();
    for symbol in &settings.symbols {
        match fetch_validated_bars(&data_port, symbol, &run_config) {
            Ok(bars) => {
                let (period, buy, sell) = instrument_thresholds(&adapter, symbol);
                let params = StrategyParams::FixedThreshold {
                    rsi_period: period,
                    buy_below: buy,
                    sell_above: sell,
                };
                specs.push(InstrumentSpec {
                    symbol: symbol.clone(),
                    entry_conditions: params.entry_conditions(),
                    exit_conditions: params.exit_conditions(),
                    entry_logic: Logic::All,
                    exit_logic: Logic::All,
                });
                data.insert(symbol.clone(), bars);
            }
            Err(e) => warn!(symbol = %symbol, error = %e, "skipping instrument"),
        }
    }
    if specs.is_empty() {
        eprintln!("error: no instrument has usable data");
        return ExitCode::from(5);
    }

    let surviving: Vec<String> = specs.iter().map(|s| s.symbol.clone()).collect();
    let weights = normalize_weights(settings.weights.as_ref(), &surviving);

    let benchmark_bars = settings.benchmark.as_ref().and_then(|symbol| {
        match fetch_validated_bars(&data_port, symbol, &run_config) {
            Ok(bars) => Some(bars),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "benchmark unavailable, skipping");
                None
            }
        }
    });

    let result = match simulate_portfolio(
        &data,
        &specs,
        &weights,
        settings.utilization,
        benchmark_bars.as_deref(),
        &run_config.execution,
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let metrics = result.metrics_report(&run_config.metric_params);
    print_metrics("portfolio", &metrics);
    info!(fills = result.fills.len(), "portfolio simulation complete");

    if let Some(path) = output_path {
        if let Err(e) = write_equity_csv(path, &result.equity) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = build_run_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    match condition_strategy(&adapter) {
        Err(code) => return code,
        Ok(Some((entry, exit, _, _))) => {
            println!(
                "ok: condition strategy ({} entry, {} exit conditions)",
                entry.len(),
                exit.len()
            );
        }
        Ok(None) => match build_grid_spec(&adapter) {
            Ok(spec) => {
                let grid = expand(&spec);
                println!("ok: grid strategy ({} parameter sets)", grid.len());
            }
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        },
    }

    if adapter.get_string("portfolio", "symbols").is_some() {
        match build_portfolio_settings(&adapter) {
            Ok(settings) => {
                println!("ok: portfolio section ({} symbols)", settings.symbols.len())
            }
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    ExitCode::SUCCESS
}

fn run_list_symbols(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data_port = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(code) => return code,
    };
    match data_port.list_symbols() {
        Ok(symbols) => {
            for symbol in symbols {
                println!("{symbol}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn print_metrics(label: &str, metrics: &BTreeMap<String, f64>) {
    println!("results for {label}:");
    for (key, value) in metrics {
        println!("  {key:<24} {value:>14.6}");
    }
}

fn print_grid(symbol: &str, outcomes: &[GridOutcome]) {
    println!(
        "{:<32} {:>12} {:>10} {:>10} {:>10} {:>8}",
        format!("{} parameters", symbol),
        "total_return",
        "sharpe",
        "maxdd",
        "win_rate",
        "trades"
    );
    for outcome in outcomes {
        println!(
            "{:<32} {:>12.4} {:>10.4} {:>10.4} {:>10.4} {:>8}",
            outcome.params.label(),
            outcome.metrics["total_return"],
            outcome.metrics["sharpe"],
            outcome.metrics["maxdd"],
            outcome.metrics["win_rate"],
            outcome.metrics["trades_total"] as i64,
        );
    }
}

fn write_equity_csv(
    path: &PathBuf,
    equity: &[crate::domain::metrics::EquityPoint],
) -> Result<(), GridtraderError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| GridtraderError::Io(std::io::Error::other(e)))?;
    writer
        .write_record(["date", "equity"])
        .map_err(|e| GridtraderError::Io(std::io::Error::other(e)))?;
    for point in equity {
        writer
            .write_record([point.date.to_string(), point.value.to_string()])
            .map_err(|e| GridtraderError::Io(std::io::Error::other(e)))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_grid_csv(path: &PathBuf, outcomes: &[GridOutcome]) -> Result<(), GridtraderError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| GridtraderError::Io(std::io::Error::other(e)))?;

    let keys: Vec<&String> = outcomes[0].metrics.keys().collect();
    let mut header = vec!["params".to_string()];
    header.extend(keys.iter().map(|k| (*k).clone()));
    writer
        .write_record(&header)
        .map_err(|e| GridtraderError::Io(std::io::Error::other(e)))?;

    for outcome in outcomes {
        let mut row = vec![outcome.params.label()];
        for key in &keys {
            row.push(outcome.metrics[*key].to_string());
        }
        writer
            .write_record(&row)
            .map_err(|e| GridtraderError::Io(std::io::Error::other(e)))?;
    }
    writer.flush()?;
    Ok(())
}
