//! vdash - Violations Dashboard
//!
//! A CLI tool that loads violation reports from a spreadsheet, filters
//! them by location, bicycle type and date range, and reports the counts
//! per contact type over time as a table and a stacked bar chart.
//!
//! Exit codes:
//!   0 - Success (including "no data for the selected filters")
//!   1 - Runtime error (bad arguments, config, download or parse failure)
//!   2 - No data for the selected filters and --fail-on-empty is set

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod source;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use models::{AppliedFilters, PivotTable, Report, ReportMetadata, Reshaped};
use source::{LoadOptions, SourceSpec};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("vdash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_dashboard(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Dashboard update failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .vdash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the source URL, column names, filters and chart output.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Run one dashboard update. Returns the exit code (0 or 2).
async fn run_dashboard(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Step 1: Load the records
    let spec = source_spec(&args, &config)?;
    println!("📥 Loading records from: {}", spec.describe());

    let load_options = LoadOptions {
        columns: config.columns.clone(),
        timeout_seconds: config.source.timeout_seconds,
        show_progress: !args.quiet,
    };

    let raw = match source::load_records(&spec, &load_options).await {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to load records: {}", e);
            eprintln!("\n❌ Error loading data: {}", e);
            return Ok(1);
        }
    };

    // Step 2: Derive location group, bicycle type and contact type
    let records = analysis::derive_all(raw);
    info!("Loaded {} records", records.len());

    if args.list_options {
        let options = analysis::filter_options(&records);
        println!("\n{}", report::generate_options_text(&options));
        return Ok(0);
    }

    // Step 3: Resolve the filter selections
    let criteria = config
        .filters
        .to_criteria(analysis::date_bounds(&records), Utc::now().date_naive());
    let applied = AppliedFilters::from(&criteria);

    println!("🔎 Filtering records...");
    println!("   Locations: {}", applied.locations);
    println!("   Bicycle type: {}", applied.bicycle);
    println!(
        "   Date range: {} to {}",
        applied.start.format("%Y-%m-%d"),
        applied.end.format("%Y-%m-%d")
    );
    println!("   Aggregation: {}", applied.granularity);

    // Step 4: Filter, bucket and pivot
    let result = analysis::reshape(
        &records,
        &criteria.locations,
        criteria.bicycle,
        criteria.start,
        criteria.end,
        criteria.granularity,
    );
    let records_matched = result.table().map(PivotTable::total).unwrap_or(0);

    // Step 5: Build and save the report
    let report = Report {
        metadata: ReportMetadata {
            source: spec.describe(),
            generated_at: Utc::now(),
            records_loaded: records.len(),
            records_matched,
            filters: applied,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        result,
    };

    println!("\n📝 Generating report...");
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };
    let output_path = PathBuf::from(&config.report.output);
    report::write_report(&output, &output_path)?;

    // Step 6: Chart or notice
    match &report.result {
        Reshaped::Table(table) => {
            if config.chart.enabled {
                let chart_path = PathBuf::from(&config.chart.path);
                let options = report::ChartOptions::from(&config.chart);
                report::render_chart(table, &chart_path, &options)?;
                println!("📈 Chart saved to: {}", chart_path.display());
            }

            println!("\n📊 Summary:");
            println!("   Periods: {}", table.periods.len());
            println!("   Contact types: {}", table.contact_types.join(", "));
            println!("   Matching records: {}", records_matched);
        }
        Reshaped::Empty => {
            warn!("No records match the selected filters");
            println!("\n⚠️  {}", report::NO_DATA_MESSAGE);
            if config.chart.enabled {
                let chart_path = PathBuf::from(&config.chart.path);
                if report::remove_stale_chart(&chart_path)? {
                    println!("   Removed previous chart: {}", chart_path.display());
                }
                println!("   No chart written.");
            }
        }
    }

    println!(
        "\n✅ Dashboard updated in {:.1}s. Report saved to: {}",
        start_time.elapsed().as_secs_f64(),
        output_path.display()
    );

    if report.result.is_empty() && args.fail_on_empty {
        eprintln!("\n⛔ No data for the selected filters. Failing (exit code 2).");
        return Ok(2);
    }

    Ok(0)
}

/// Resolve where to load records from: --file, then the source URL.
fn source_spec(args: &Args, config: &Config) -> Result<SourceSpec> {
    if let Some(ref file) = args.file {
        return Ok(SourceSpec::File(file.clone()));
    }

    if config.source.url.is_empty() {
        bail!(
            "No record source given. Use --source, --file, or set [source] url in {}",
            CONFIG_FILE
        );
    }

    Ok(SourceSpec::Url {
        url: config.source.url.clone(),
        bearer_token: args.token.clone(),
    })
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
