//! fx-reconcile CLI - fetch, reconcile and export exchange-rate series
//!
//! ## Example Usage
//!
//! ```bash
//! # List currencies offered by the rate service
//! fx-reconcile currencies
//!
//! # Fetch two currencies weekly and write chart rows and a CSV export
//! fx-reconcile fetch -c EUR,JPY --start 2024-01-01 --end 2024-06-30 -i 1wk \
//!     --chart rows.json --export rates.csv
//!
//! # Analyze an uploaded file
//! fx-reconcile analyze my_rates.csv -c EUR,GBP
//!
//! # Work offline against a local long-format file
//! fx-reconcile --local history.csv fetch -c EUR --start 2024-01-01 --end 2024-02-01
//!
//! # Reconcile a saved service response
//! fx-reconcile align response.json --export rates.csv
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;
use fx_reconcile::align::{align, legend};
use fx_reconcile::api::{CurrencyCatalog, ExchangeRateRequest, SeriesResponse};
use fx_reconcile::config::ClientConfig;
use fx_reconcile::controller::{Controller, Phase, RequestForm, SourceMode, ViewState};
use fx_reconcile::dates::{parse_calendar_date, today};
use fx_reconcile::error::Result as FxResult;
use fx_reconcile::export::{write_flat, TEMPLATE_FILE_NAME};
use fx_reconcile::interval::Interval;
use fx_reconcile::series::CurrencySeries;
use fx_reconcile::sources::{CsvUpload, HttpRateSource, LocalRateSource, RateSource};
use fx_reconcile::types::Date;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

/// fx-reconcile: exchange-rate series reconciliation and export
#[derive(Parser)]
#[command(name = "fx-reconcile")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch, align and export historical exchange-rate series", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rate service base URL (overrides the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Answer from a local Date,Currency,Rate file instead of the service
    #[arg(long, global = true, value_name = "CSV")]
    local: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available currencies
    Currencies,

    /// Fetch historical rates from the rate service
    Fetch {
        /// Currency codes, comma separated
        #[arg(short = 'c', long, value_delimiter = ',')]
        currencies: Vec<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(short = 's', long)]
        start: String,

        /// End date (YYYY-MM-DD)
        #[arg(short = 'e', long)]
        end: String,

        /// Interval: 1d, 1wk or 1mo (default from config)
        #[arg(short = 'i', long)]
        interval: Option<Interval>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Upload a Date,Currency,Rate CSV for analysis
    Analyze {
        /// CSV file to upload
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Currency codes, comma separated
        #[arg(short = 'c', long, value_delimiter = ',')]
        currencies: Vec<String>,

        /// Start date (YYYY-MM-DD); defaults to the first date in the file
        #[arg(short = 's', long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD); defaults to the last date in the file
        #[arg(short = 'e', long)]
        end: Option<String>,

        /// Interval: 1d, 1wk or 1mo (default from config)
        #[arg(short = 'i', long)]
        interval: Option<Interval>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Download the CSV upload template
    Template {
        /// Output file (default: <output_dir>/exchange_rates_template.csv)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Align a saved service response without contacting the service
    Align {
        /// JSON file holding a response body or a list of series
        #[arg(value_name = "RESPONSE")]
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args, Clone, Default)]
struct OutputArgs {
    /// Write aligned chart rows as JSON
    #[arg(long, value_name = "JSON")]
    chart: Option<PathBuf>,

    /// Write the long-format CSV export
    #[arg(long, value_name = "CSV")]
    export: Option<PathBuf>,
}

/// The two collaborators behind one type
enum Source {
    Http(HttpRateSource),
    Local(LocalRateSource),
}

impl RateSource for Source {
    async fn currencies(&self) -> FxResult<CurrencyCatalog> {
        match self {
            Source::Http(s) => s.currencies().await,
            Source::Local(s) => s.currencies().await,
        }
    }

    async fn exchange_rates(&self, request: &ExchangeRateRequest) -> FxResult<SeriesResponse> {
        match self {
            Source::Http(s) => s.exchange_rates(request).await,
            Source::Local(s) => s.exchange_rates(request).await,
        }
    }

    async fn analyze_csv(
        &self,
        upload: &CsvUpload,
        request: &ExchangeRateRequest,
    ) -> FxResult<SeriesResponse> {
        match self {
            Source::Http(s) => s.analyze_csv(upload, request).await,
            Source::Local(s) => s.analyze_csv(upload, request).await,
        }
    }

    async fn download_template(&self) -> FxResult<Vec<u8>> {
        match self {
            Source::Http(s) => s.download_template().await,
            Source::Local(s) => s.download_template().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Source::Http(s) => s.name(),
            Source::Local(s) => s.name(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = ClientConfig::load(cli.config.as_deref());
    if let Some(url) = cli.api_url.clone() {
        config.api_base_url = url;
    }

    if cli.verbose {
        println!(
            "{} v{}",
            "fx-reconcile".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
    }

    if let Err(e) = run(cli, config).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> anyhow::Result<()> {
    let Cli {
        verbose,
        local,
        command,
        ..
    } = cli;

    if let Commands::Align { input, output } = &command {
        return align_saved(input, output);
    }

    let source = build_source(local.as_deref(), &config)?;
    if verbose {
        println!("Source: {}", source.name().dimmed());
    }

    match command {
        Commands::Currencies => list_currencies(&source).await,
        Commands::Fetch {
            currencies,
            start,
            end,
            interval,
            output,
        } => {
            let form = RequestForm::api(
                normalize_codes(currencies),
                parse_date_arg("--start", &start)?,
                parse_date_arg("--end", &end)?,
            )
            .with_interval(interval.unwrap_or(config.default_interval));
            run_query(&source, &form, &output).await
        }
        Commands::Analyze {
            file,
            currencies,
            start,
            end,
            interval,
            output,
        } => {
            let upload = CsvUpload::from_path(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            // missing bounds are left to the source: it uses the file's span
            let start = start.map(|s| parse_date_arg("--start", &s)).transpose()?;
            let end = end.map(|e| parse_date_arg("--end", &e)).transpose()?;
            let form = RequestForm::csv(normalize_codes(currencies), start, end, Some(upload))
                .with_interval(interval.unwrap_or(config.default_interval));
            run_query(&source, &form, &output).await
        }
        Commands::Template { output } => download_template(&source, output, &config).await,
        // answered before a source was needed
        Commands::Align { .. } => Ok(()),
    }
}

fn build_source(local: Option<&Path>, config: &ClientConfig) -> anyhow::Result<Source> {
    match local {
        Some(path) => Ok(Source::Local(
            LocalRateSource::from_path(path)
                .with_context(|| format!("loading local store {}", path.display()))?,
        )),
        None => Ok(Source::Http(HttpRateSource::with_timeout(
            config.api_base_url.clone(),
            config.timeout(),
        )?)),
    }
}

fn normalize_codes(codes: Vec<String>) -> Vec<String> {
    codes
        .into_iter()
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}

fn parse_date_arg(flag: &str, value: &str) -> anyhow::Result<Date> {
    parse_calendar_date(value).with_context(|| format!("{} expects YYYY-MM-DD", flag))
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn list_currencies(source: &Source) -> anyhow::Result<()> {
    let pb = spinner("Loading currencies...");
    let catalog = source.currencies().await;
    pb.finish_and_clear();
    let catalog = catalog?;

    println!("{}", "Available Currencies".cyan().bold());
    println!("{}", "====================".cyan());
    for (code, name) in &catalog {
        println!("  {}  {}", code.bold(), name);
    }
    println!();
    println!("{} currencies", catalog.len());
    Ok(())
}

async fn run_query(source: &Source, form: &RequestForm, output: &OutputArgs) -> anyhow::Result<()> {
    let mut controller = Controller::new();
    let label = match form.mode {
        SourceMode::Api => "Fetching exchange rates...",
        SourceMode::CsvUpload => "Analyzing CSV...",
    };

    let pb = spinner(label);
    if let Err(e) = controller.submit(form, source, today()).await {
        // also recorded in the state, rendered below like any failure
        log::debug!("Submission rejected: {}", e);
    }
    pb.finish_and_clear();

    let state = controller.state();
    render_state(state);

    if state.phase != Phase::Succeeded {
        bail!(
            "{}",
            state.error.clone().unwrap_or_else(|| "request failed".to_string())
        );
    }
    if let Some(report) = &state.report {
        write_outputs(&report.series, output)?;
    }
    Ok(())
}

fn render_state(state: &ViewState) {
    if state.clamp_notice {
        println!(
            "{} End date is in the future; the service limits the range to today.",
            "Note:".yellow().bold()
        );
    }

    for warning in &state.warnings {
        println!("{} {}", "Warning:".yellow(), warning);
    }

    let Some(report) = &state.report else {
        return;
    };

    if let Some(message) = &report.message {
        println!("{}", message.dimmed());
    }
    println!();
    print_summary(&report.series);
    println!();
    println!(
        "  {} aligned rows across {} series",
        report.rows.len().to_string().bold(),
        report.series.len()
    );
}

fn print_summary(series: &[CurrencySeries]) {
    println!("{}", "Summary".green().bold());
    println!("{}", "=======".green());
    println!(
        "  {:<6} {:>12} {:>12} {:>12} {:>12} {:>9}  {}",
        "Code", "Start", "End", "Min", "Max", "Change", "Points"
    );
    for s in series {
        let change = format!("{:+.2}%", s.percentage_change);
        let change = if s.percentage_change >= 0.0 {
            change.bright_green()
        } else {
            change.red()
        };
        println!(
            "  {:<6} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>9}  {}",
            s.currency.bold(),
            s.start_rate,
            s.end_rate,
            s.min_rate,
            s.max_rate,
            change,
            s.len()
        );
    }
}

fn write_outputs(series: &[CurrencySeries], output: &OutputArgs) -> anyhow::Result<()> {
    if let Some(path) = &output.chart {
        let rows = align(series);
        let json = serde_json::to_string_pretty(&rows)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!(
            "{} Chart rows ({}) saved to: {}",
            "✓".green().bold(),
            legend(series).join(", "),
            path.display()
        );
    }

    if let Some(path) = &output.export {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let count = write_flat(series, BufWriter::new(file))?;
        println!(
            "{} {} records exported to: {}",
            "✓".green().bold(),
            count,
            path.display()
        );
    }
    Ok(())
}

async fn download_template(
    source: &Source,
    output: Option<PathBuf>,
    config: &ClientConfig,
) -> anyhow::Result<()> {
    let path = match output {
        Some(path) => path,
        None => {
            config.ensure_dirs()?;
            config.output_dir.join(TEMPLATE_FILE_NAME)
        }
    };

    let bytes = source.download_template().await?;
    fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    println!(
        "{} Template saved to: {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Accepts either a full response body or a bare list of series
fn align_saved(input: &Path, output: &OutputArgs) -> anyhow::Result<()> {
    let text = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let series: Vec<CurrencySeries> = match serde_json::from_str::<SeriesResponse>(&text) {
        Ok(response) => response.data,
        Err(_) => serde_json::from_str(&text)
            .with_context(|| format!("{} is neither a response nor a series list", input.display()))?,
    };

    if series.is_empty() {
        bail!("{} contains no series", input.display());
    }

    print_summary(&series);
    println!();
    println!("  {} aligned rows", align(&series).len().to_string().bold());

    if output.chart.is_none() && output.export.is_none() {
        println!(
            "{} Nothing written; pass --chart and/or --export",
            "Note:".yellow()
        );
    }
    write_outputs(&series, output)
}
