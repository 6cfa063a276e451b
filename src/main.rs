use chrono::{Duration, FixedOffset, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

use passcast::abort::AbortHandle;
use passcast::config::{parse_duration, parse_timezone, Config, ConfigError};
use passcast::predict::{
    Catalog, ElementSet, Observer, PassRecord, PassRequest, PredictError, SearchWindow,
    Sgp4Geometry,
};
use passcast::report::{format_passes, render_table, to_csv_string, PassReport, ReportError};
use passcast::web;

#[derive(Parser)]
#[command(name = "passcast")]
#[command(about = "Satellite pass prediction for a fixed ground station")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict passes over a range of local days
    Predict(PredictArgs),
    /// Check that an element set file parses and propagates
    ValidateTle { file: PathBuf },
    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Args)]
struct PredictArgs {
    /// Station config; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Element set file (optional name line plus two element lines)
    #[arg(long, conflicts_with = "satellite")]
    tle: Option<PathBuf>,
    /// Catalog name substring or catalog number
    #[arg(long)]
    satellite: Option<String>,
    /// Catalog file or directory of .tle/.txt files
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// "LAT, LON" in degrees
    #[arg(long)]
    coordinates: Option<String>,
    /// Altitude in metres
    #[arg(long)]
    altitude: Option<f64>,
    /// First local day (YYYY-MM-DD)
    #[arg(long)]
    start: NaiveDate,
    /// Last local day, inclusive; defaults to the first
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Elevation threshold in degrees
    #[arg(long)]
    threshold: Option<f64>,
    /// Coarse search step, e.g. 10s
    #[arg(long, value_parser = parse_duration)]
    step: Option<Duration>,
    /// Observer time zone: UTC, Z or ±HH:MM
    #[arg(long, value_parser = parse_timezone)]
    timezone: Option<FixedOffset>,
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
    /// Write to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    /// Give up after this long, e.g. 30s
    #[arg(long, value_parser = parse_duration)]
    timeout: Option<Duration>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Predict(#[from] PredictError),
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Predict(args) => predict(args),
        Commands::ValidateTle { file } => validate_tle(&file),
        Commands::Serve { config } => serve(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn predict(args: PredictArgs) -> Result<(), CliError> {
    let config = args.config.as_deref().map(Config::from_file).transpose()?;

    let observer = match (&args.coordinates, &config) {
        (Some(coordinates), _) => {
            let altitude = args
                .altitude
                .or(config.as_ref().map(|c| c.station.altitude_m));
            Observer::from_coordinates(coordinates, altitude)?
        }
        (None, Some(config)) => {
            let mut observer = config.observer()?;
            if let Some(altitude) = args.altitude {
                observer.altitude_m = altitude;
            }
            observer
        }
        (None, None) => {
            return Err(CliError::Usage(
                "station coordinates required (--coordinates or --config)".into(),
            ))
        }
    };

    let mut options = config
        .as_ref()
        .map(|c| c.search_options())
        .unwrap_or_default();
    if let Some(threshold) = args.threshold {
        options.threshold_deg = threshold;
    }
    if let Some(step) = args.step {
        options.step = step;
    }
    if let Some(timezone) = args.timezone {
        options.timezone = timezone;
    }

    let element_set = match (&args.tle, &args.satellite) {
        (Some(path), _) => {
            let text = fs::read_to_string(path)?;
            ElementSet::from_upload(&path.display().to_string(), &text)?
        }
        (None, Some(query)) => {
            let catalog_path = args
                .catalog
                .clone()
                .or_else(|| config.as_ref()?.catalog.as_ref().map(|c| c.path.clone()))
                .ok_or_else(|| {
                    CliError::Usage("--satellite needs --catalog or a catalog in --config".into())
                })?;
            Catalog::load(&catalog_path)?.find(query)?.clone()
        }
        (None, None) => {
            return Err(CliError::Usage("one of --tle or --satellite is required".into()))
        }
    };

    let last_day = args.end.unwrap_or(args.start);
    let window = SearchWindow::from_local_dates(args.start, last_day, options.timezone)?;

    let mut abort = AbortHandle::new();
    if let Some(timeout) = args.timeout {
        let timeout = timeout
            .to_std()
            .map_err(|e| CliError::Usage(format!("invalid timeout: {}", e)))?;
        if let Some(deadline) = std::time::Instant::now().checked_add(timeout) {
            abort = abort.with_deadline(deadline);
        }
    }

    let request = PassRequest {
        observer,
        element_set,
        window,
        options,
    };
    let records = request.run(&abort)?;

    let rendered = render(&records, args.format, options.timezone)?;
    match args.output {
        Some(path) => {
            fs::write(&path, rendered)?;
            log::info!("Wrote {} passes to {}", records.len(), path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn render(records: &[PassRecord], format: Format, tz: FixedOffset) -> Result<String, CliError> {
    Ok(match format {
        Format::Table => render_table(records, tz),
        Format::Csv => to_csv_string(&format_passes(records, tz))?,
        Format::Json => {
            let reports: Vec<_> = records.iter().map(|r| PassReport::new(r, tz)).collect();
            let mut json = serde_json::to_string_pretty(&reports)?;
            json.push('\n');
            json
        }
    })
}

fn validate_tle(path: &Path) -> Result<(), CliError> {
    let text = fs::read_to_string(path)?;
    let element_set = ElementSet::from_upload(&path.display().to_string(), &text)?;
    let geometry = Sgp4Geometry::new(&element_set)?;

    println!("Element set is valid");
    println!("  name:   {}", element_set.name);
    if let Some(number) = element_set.catalog_number() {
        println!("  number: {}", number);
    }
    println!("  epoch:  {}", geometry.epoch());
    Ok(())
}

fn serve(config_path: &Path) -> Result<(), CliError> {
    let config = Config::from_file(config_path)?;
    let state = web::AppState::new(config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(web::run_server(state))?;
    Ok(())
}
