//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{
    check_preconditions, BacktestConfig, BacktestResult, FillTiming, Simulation,
};
use crate::domain::config_validation::{
    parse_date, validate_config, validate_date_range, validate_period,
};
use crate::domain::error::MacrossError;
use crate::domain::metrics::Metrics;
use crate::domain::price_series::PriceSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_CODE: &str = "AAPL";

#[derive(Parser, Debug)]
#[command(name = "macross", about = "Moving-average crossover backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// CSV file, or a directory of <CODE>.csv files
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(long)]
        code: Option<String>,
        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// Directory for the CSV reports
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Suppress the per-event trade log
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command-line values that take precedence over the `[data]` and
/// `[report]` sections.
#[derive(Debug, Clone, Default)]
pub struct DataOverrides {
    pub data: Option<PathBuf>,
    pub code: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub path: Option<PathBuf>,
    pub code: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub output_dir: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            code,
            start,
            end,
            output,
            quiet,
        } => run_backtest(
            config.as_deref(),
            &DataOverrides {
                data,
                code,
                start,
                end,
                output,
            },
            quiet,
        ),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, MacrossError> {
    match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path)
        }
        None => FileConfigAdapter::from_string(""),
    }
}

fn run_backtest(config_path: Option<&Path>, overrides: &DataOverrides, quiet: bool) -> ExitCode {
    match execute_backtest(config_path, overrides, quiet) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn execute_backtest(
    config_path: Option<&Path>,
    overrides: &DataOverrides,
    quiet: bool,
) -> Result<(BacktestResult, Metrics), MacrossError> {
    let adapter = load_config(config_path)?;
    let mut bt_config = build_backtest_config(&adapter)?;
    if quiet {
        bt_config.printlog = false;
    }
    let settings = build_data_settings(&adapter, overrides)?;

    let path = settings
        .path
        .clone()
        .ok_or_else(|| MacrossError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })?;
    let data_port = CsvAdapter::new(path);
    let report_port: &dyn ReportPort = &CsvReportAdapter::new();

    run_backtest_pipeline(&data_port, Some(report_port), &bt_config, &settings)
}

fn read_period(
    adapter: &dyn ConfigPort,
    key: &str,
    default: usize,
) -> Result<usize, MacrossError> {
    match adapter.get_int("strategy", key)? {
        Some(raw) => validate_period(key, raw),
        None => Ok(default),
    }
}

/// Build and validate the simulation parameters. Absent keys take their
/// defaults.
pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, MacrossError> {
    let defaults = BacktestConfig::default();

    let fill_timing = match adapter.get_string("backtest", "fill_timing") {
        Some(raw) => raw
            .parse::<FillTiming>()
            .map_err(|reason| MacrossError::invalid("backtest", "fill_timing", reason))?,
        None => defaults.fill_timing,
    };

    let config = BacktestConfig {
        short_period: read_period(adapter, "short_period", defaults.short_period)?,
        long_period: read_period(adapter, "long_period", defaults.long_period)?,
        initial_cash: adapter
            .get_double("backtest", "initial_cash")?
            .unwrap_or(defaults.initial_cash),
        commission_rate: adapter
            .get_double("backtest", "commission_rate")?
            .unwrap_or(defaults.commission_rate),
        position_size: adapter
            .get_double("strategy", "position_size")?
            .unwrap_or(defaults.position_size),
        printlog: adapter
            .get_bool("strategy", "printlog")?
            .unwrap_or(defaults.printlog),
        fill_timing,
        risk_free_rate: adapter
            .get_double("backtest", "risk_free_rate")?
            .unwrap_or(defaults.risk_free_rate),
        annualization_factor: adapter
            .get_double("backtest", "annualization_factor")?
            .unwrap_or(defaults.annualization_factor),
    };

    validate_config(&config)?;
    Ok(config)
}

/// Resolve the data source, symbol, date window and report directory from
/// the config file and command-line overrides.
pub fn build_data_settings(
    adapter: &dyn ConfigPort,
    overrides: &DataOverrides,
) -> Result<DataSettings, MacrossError> {
    let start = overrides
        .start
        .clone()
        .or_else(|| adapter.get_string("data", "start_date"));
    let end = overrides
        .end
        .clone()
        .or_else(|| adapter.get_string("data", "end_date"));

    let start_date = parse_date(start.as_deref(), "start_date")?;
    let end_date = parse_date(end.as_deref(), "end_date")?;
    validate_date_range(start_date, end_date)?;

    Ok(DataSettings {
        path: overrides
            .data
            .clone()
            .or_else(|| adapter.get_string("data", "path").map(PathBuf::from)),
        code: overrides
            .code
            .clone()
            .or_else(|| adapter.get_string("data", "code"))
            .unwrap_or_else(|| DEFAULT_CODE.to_string()),
        start_date,
        end_date,
        output_dir: overrides
            .output
            .clone()
            .or_else(|| adapter.get_string("report", "output_dir").map(PathBuf::from)),
    })
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.to_string())
}

/// Load the series, run the simulation bar by bar, print the trade log and
/// summary, and write the reports when an output directory is set.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: Option<&dyn ReportPort>,
    bt_config: &BacktestConfig,
    settings: &DataSettings,
) -> Result<(BacktestResult, Metrics), MacrossError> {
    validate_config(bt_config)?;

    eprintln!(
        "Loading {} ({} to {})",
        settings.code,
        fmt_date(settings.start_date),
        fmt_date(settings.end_date)
    );
    let bars = data_port.fetch_ohlcv(&settings.code, settings.start_date, settings.end_date)?;
    let series = PriceSeries::new(settings.code.clone(), bars)?;
    check_preconditions(&series, bt_config)?;

    eprintln!(
        "Running backtest: SMA({}) / SMA({}), {} bars, {} to {}, fill at {}",
        bt_config.short_period,
        bt_config.long_period,
        series.len(),
        fmt_date(series.first_date()),
        fmt_date(series.last_date()),
        bt_config.fill_timing,
    );
    eprintln!("Starting Portfolio Value: {:.2}", bt_config.initial_cash);

    let mut simulation = Simulation::new(&series, bt_config);
    let mut printed = 0;
    while simulation.step() {
        if bt_config.printlog {
            for event in &simulation.events()[printed..] {
                println!("{event}");
            }
        }
        printed = simulation.events().len();
    }
    let result = simulation.finish();
    if bt_config.printlog {
        for event in &result.events[printed..] {
            println!("{event}");
        }
    }

    let metrics = Metrics::compute(&result);
    eprintln!("Final Portfolio Value: {:.2}", metrics.ending_equity);
    if let Some(position) = result.open_position() {
        eprintln!(
            "Open position: {} shares from {} at {:.2}",
            position.quantity, position.entry_date, position.entry_price
        );
    }
    println!("\n{metrics}");

    if let (Some(port), Some(dir)) = (report_port, settings.output_dir.as_deref()) {
        port.write(&result, &metrics, dir)?;
        eprintln!("\nReport written to: {}", dir.display());
    }

    Ok((result, metrics))
}

fn run_validate(config_path: &Path) -> ExitCode {
    let checked = load_config(Some(config_path)).and_then(|adapter| {
        let config = build_backtest_config(&adapter)?;
        let settings = build_data_settings(&adapter, &DataOverrides::default())?;
        Ok((config, settings))
    });

    let (config, settings) = match checked {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nStrategy:");
    eprintln!(
        "  SMA({}) / SMA({}), position size {:.0}%",
        config.short_period,
        config.long_period,
        config.position_size * 100.0
    );
    eprintln!("\nBacktest:");
    eprintln!("  initial cash:    {:.2}", config.initial_cash);
    eprintln!("  commission rate: {}", config.commission_rate);
    eprintln!("  fill timing:     {}", config.fill_timing);
    eprintln!("  minimum bars:    {}", config.minimum_bars());
    eprintln!("\nData:");
    eprintln!("  code:  {}", settings.code);
    match &settings.path {
        Some(path) => eprintln!("  path:  {}", path.display()),
        None => eprintln!("  path:  (not set, pass --data)"),
    }
    eprintln!(
        "  range: {} to {}",
        fmt_date(settings.start_date),
        fmt_date(settings.end_date)
    );

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
