//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::{CsvAdapter, DEFAULT_FUNDAMENTALS_FILE};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::inverse_volatility::InverseVolatilityOptimizer;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::calendar::RebalanceFrequency;
use crate::domain::combine::FactorWeights;
use crate::domain::config_validation::{
    configured_factors, parse_date, validate_backtest_config, DEFAULT_END_DATE,
    DEFAULT_START_DATE, DEFAULT_TOP_N,
};
use crate::domain::error::FactorbtError;
use crate::domain::factor::{
    FactorKind, FactorParams, DEFAULT_MOMENTUM_WINDOW, DEFAULT_VOLATILITY_WINDOW,
};
use crate::domain::metrics::{MetricsResult, TRADING_DAYS_PER_YEAR};
use crate::domain::rebalance::{WeightingMode, WeightingPolicy};
use crate::domain::simulation::ValueSeries;
use crate::domain::universe::{load_price_table, parse_codes, validate_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_OUTPUT_DIR: &str = "report";

#[derive(Parser, Debug)]
#[command(name = "factorbt", about = "Cross-sectional factor backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory for the CSV report
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overrides [backtest] start_date
        #[arg(long)]
        start: Option<String>,
        /// Overrides [backtest] end_date
        #[arg(long)]
        end: Option<String>,
        /// Comma-separated factor list, overrides [backtest] factors
        #[arg(long)]
        factors: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        top_n: Option<i64>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
}

/// Command-line values layered over a configuration source.
pub struct ConfigOverrides<'a> {
    base: &'a dyn ConfigPort,
    values: HashMap<(String, String), String>,
}

impl<'a> ConfigOverrides<'a> {
    pub fn new(base: &'a dyn ConfigPort) -> Self {
        Self {
            base,
            values: HashMap::new(),
        }
    }

    pub fn set(mut self, section: &str, key: &str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.values
                .insert((section.to_string(), key.to_string()), value);
        }
        self
    }

    fn lookup(&self, section: &str, key: &str) -> Option<&String> {
        self.values.get(&(section.to_string(), key.to_string()))
    }
}

impl ConfigPort for ConfigOverrides<'_> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.lookup(section, key)
            .cloned()
            .or_else(|| self.base.get_string(section, key))
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.lookup(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self.base.get_int(section, key, default),
        }
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.lookup(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self.base.get_double(section, key, default),
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.lookup(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self.base.get_bool(section, key, default),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            output,
            start,
            end,
            factors,
            top_n,
            dry_run,
        } => load_config(&config).and_then(|file| {
            let overrides = ConfigOverrides::new(&file)
                .set("backtest", "start_date", start)
                .set("backtest", "end_date", end)
                .set("backtest", "factors", factors)
                .set("backtest", "top_n", top_n.map(|n| n.to_string()));
            if dry_run {
                run_dry_run(&overrides)
            } else {
                let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
                run_backtest(&overrides, &output)
            }
        }),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { config, code } => run_info(&config, code.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FactorbtError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

/// Data adapter for the `[data]` section.
pub fn data_adapter(config: &dyn ConfigPort) -> Result<CsvAdapter, FactorbtError> {
    let path = config.require_string("data", "path")?;
    let fundamentals = config
        .get_string("data", "fundamentals")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FUNDAMENTALS_FILE.to_string());
    Ok(CsvAdapter::new(PathBuf::from(path)).with_fundamentals_file(fundamentals.trim()))
}

fn invalid(section: &str, key: &str, reason: &str) -> FactorbtError {
    FactorbtError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

fn window_param(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, FactorbtError> {
    let raw = config.get_int(section, key, default as i64);
    usize::try_from(raw).map_err(|_| invalid(section, key, "must be a non-negative integer"))
}

/// Literal blend weights from `[weights]`, or `None` when none are set.
fn factor_weights(config: &dyn ConfigPort) -> Result<Option<FactorWeights>, FactorbtError> {
    let mut weights = FactorWeights::new();
    for kind in FactorKind::ALL {
        if let Some(raw) = config.get_string("weights", kind.name()) {
            let w: f64 = raw
                .trim()
                .parse()
                .map_err(|_| invalid("weights", kind.name(), "factor weight must be a number"))?;
            weights.insert(kind, w);
        }
    }
    Ok((!weights.is_empty()).then_some(weights))
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, FactorbtError> {
    let start_date: NaiveDate = parse_date(config, "start_date", DEFAULT_START_DATE)?;
    let end_date: NaiveDate = parse_date(config, "end_date", DEFAULT_END_DATE)?;

    let top_n = config.get_int("backtest", "top_n", DEFAULT_TOP_N);
    if top_n < 1 {
        return Err(FactorbtError::InvalidTopN(top_n));
    }

    let rebalance = match config.get_string("backtest", "rebalance") {
        Some(raw) => raw.parse()?,
        None => RebalanceFrequency::default(),
    };

    let periods = config.get_int(
        "backtest",
        "periods_per_year",
        i64::from(TRADING_DAYS_PER_YEAR),
    );
    let periods_per_year = u32::try_from(periods)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| invalid("backtest", "periods_per_year", "must be a positive integer"))?;

    Ok(BacktestConfig {
        start_date,
        end_date,
        factors: configured_factors(config)?,
        factor_weights: factor_weights(config)?,
        top_n: top_n as usize,
        rebalance,
        params: FactorParams {
            momentum_window: window_param(
                config,
                "factors",
                "momentum_window",
                DEFAULT_MOMENTUM_WINDOW,
            )?,
            volatility_window: window_param(
                config,
                "factors",
                "volatility_window",
                DEFAULT_VOLATILITY_WINDOW,
            )?,
        },
        risk_free_rate: config.get_double("backtest", "risk_free_rate", 0.0),
        periods_per_year,
    })
}

pub fn weighting_mode(config: &dyn ConfigPort) -> Result<WeightingMode, FactorbtError> {
    match config.get_string("backtest", "weighting") {
        Some(raw) => raw.parse(),
        None => Ok(WeightingMode::default()),
    }
}

pub fn resolve_codes(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, FactorbtError> {
    match code_override {
        Some(code) => Ok(parse_codes(code)?),
        None => Ok(parse_codes(&config.require_string("backtest", "codes")?)?),
    }
}

/// Loads data through `data_port` and runs the full pipeline.
pub fn execute_backtest(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
) -> Result<BacktestResult, FactorbtError> {
    validate_backtest_config(config)?;
    let bt_config = build_backtest_config(config)?;
    let codes = resolve_codes(None, config)?;

    info!(
        codes = codes.len(),
        start = %bt_config.start_date,
        end = %bt_config.end_date,
        "validating universe"
    );
    let validation = validate_universe(data_port, codes, bt_config.start_date, bt_config.end_date)?;
    let universe = validation.universe;
    let prices = load_price_table(data_port, &universe, bt_config.start_date, bt_config.end_date)?;

    let fundamentals = if bt_config.factors.contains(&FactorKind::Value) {
        Some(data_port.fetch_fundamentals(&universe.codes)?)
    } else {
        None
    };

    let benchmark = match config
        .get_string("data", "benchmark")
        .map(|b| b.trim().to_uppercase())
        .filter(|b| !b.is_empty())
    {
        Some(code) => {
            let closes = data_port.fetch_closes(&code, bt_config.start_date, bt_config.end_date)?;
            let points: Vec<(NaiveDate, f64)> = closes.iter().map(|p| (p.date, p.close)).collect();
            info!(%code, bars = points.len(), "loaded benchmark");
            Some(ValueSeries::from_prices(&points)?)
        }
        None => None,
    };

    let optimizer = InverseVolatilityOptimizer::new(bt_config.params.volatility_window);
    let policy = match weighting_mode(config)? {
        WeightingMode::Equal => WeightingPolicy::Equal,
        WeightingMode::Optimizer => WeightingPolicy::Optimizer(&optimizer),
    };

    backtest_engine::run_backtest(
        &prices,
        fundamentals.as_ref(),
        benchmark.as_ref(),
        &bt_config,
        &policy,
    )
}

fn print_metrics(label: &str, metrics: &MetricsResult) {
    println!("\n=== {label} ===");
    println!("Sharpe Ratio:     {:.2}", metrics.sharpe);
    println!("Max Drawdown:     {:.2}%", metrics.max_drawdown * 100.0);
    println!("CAGR:             {:.2}%", metrics.cagr * 100.0);
}

pub fn print_summary(result: &BacktestResult) {
    let last = result.values.points.last().map(|p| p.value).unwrap_or(1.0);
    println!(
        "Backtest: {} dates, {} rebalances, final value {:.4}",
        result.values.len(),
        result.weights.rebalance_dates().len(),
        last
    );
    print_metrics("Strategy", &result.metrics);
    if let Some(bench) = &result.benchmark_metrics {
        print_metrics("Benchmark", bench);
    }
}

fn run_backtest(config: &dyn ConfigPort, output: &Path) -> Result<(), FactorbtError> {
    let data_port = data_adapter(config)?;
    let result = execute_backtest(config, &data_port)?;

    print_summary(&result);
    CsvReportAdapter::new().write(&result, output)?;
    println!("\nReport written to: {}", output.display());
    Ok(())
}

pub fn run_dry_run(config: &dyn ConfigPort) -> Result<(), FactorbtError> {
    validate_backtest_config(config)?;
    let bt_config = build_backtest_config(config)?;
    let codes = resolve_codes(None, config)?;
    let mode = weighting_mode(config)?;

    let factors: Vec<&str> = bt_config.factors.iter().map(|f| f.name()).collect();
    println!("Configuration is valid");
    println!("  period:     {} to {}", bt_config.start_date, bt_config.end_date);
    println!("  codes:      {}", codes.join(", "));
    println!("  factors:    {}", factors.join(", "));
    println!("  top_n:      {}", bt_config.top_n);
    println!("  weighting:  {mode:?}");
    println!(
        "  windows:    momentum {}, volatility {}",
        bt_config.params.momentum_window, bt_config.params.volatility_window
    );
    if let Some(weights) = &bt_config.factor_weights {
        let mut blend: Vec<String> = weights.iter().map(|(k, w)| format!("{k}={w}")).collect();
        blend.sort();
        println!("  blend:      {}", blend.join(", "));
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), FactorbtError> {
    let config = load_config(config_path)?;
    validate_backtest_config(&config)?;
    println!("Configuration is valid: {}", config_path.display());
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), FactorbtError> {
    let config = load_config(config_path)?;
    let adapter = data_adapter(&config)?;

    let symbols = adapter.list_symbols()?;
    if symbols.is_empty() {
        info!("no symbols found");
    }
    for symbol in &symbols {
        println!("{symbol}");
    }
    info!(count = symbols.len(), "symbols listed");
    Ok(())
}

fn run_info(config_path: &Path, code: Option<&str>) -> Result<(), FactorbtError> {
    let config = load_config(config_path)?;
    let adapter = data_adapter(&config)?;
    let codes = resolve_codes(code, &config)?;

    for c in &codes {
        match adapter.get_data_range(c)? {
            Some((first, last, count)) => println!("{c}: {count} bars, {first} to {last}"),
            None => println!("{c}: no data found"),
        }
    }
    Ok(())
}
