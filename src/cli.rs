//! Command-line interface argument parsing.
//!
//! The flags here are the dashboard's filter controls: each invocation is
//! one "update" with the selections given on the command line, falling back
//! to the config file and then to defaults derived from the data.

use crate::models::{BicycleFilter, Granularity};
use chrono::NaiveDate;
use clap::Parser;
use std::fmt;
use std::path::PathBuf;

/// vdash - violations dashboard
///
/// Loads violation reports from a spreadsheet, filters them by location,
/// bicycle type and date, and charts the counts per contact type over time.
///
/// Examples:
///   vdash --source https://docs.google.com/spreadsheets/d/<ID>/edit
///   vdash --file reports.csv --aggregation weekly --bicycle e-bike
///   vdash --file reports.csv --location "Main St,Broadway" --start 2024-01-01
///   vdash --file reports.csv --list-options
///   vdash --init-config
#[derive(Parser, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Spreadsheet or CSV URL to load records from
    ///
    /// Google Sheets links are rewritten to their CSV export URL.
    /// Can also be set in .vdash.toml under [source].
    #[arg(short, long, value_name = "URL", env = "VDASH_SOURCE", conflicts_with = "file")]
    pub source: Option<String>,

    /// Local CSV file to load instead of downloading
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Bearer token sent with the download request
    #[arg(long, value_name = "TOKEN", env = "VDASH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Location groups to include (comma-separated), or "All"
    ///
    /// Example: --location "Main St,Broadway"
    #[arg(short, long, value_name = "GROUPS", value_delimiter = ',')]
    pub location: Option<Vec<String>>,

    /// Bicycle type to include: all, regular or e-bike
    #[arg(short, long, value_name = "TYPE")]
    pub bicycle: Option<BicycleFilter>,

    /// First day of the date range (YYYY-MM-DD)
    ///
    /// Defaults to the earliest date in the data.
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// Last day of the date range (YYYY-MM-DD)
    ///
    /// Defaults to the latest date in the data. Swapped with --start if earlier.
    #[arg(long, value_name = "DATE")]
    pub end: Option<NaiveDate>,

    /// Time bucket for aggregation
    #[arg(short, long, value_name = "PERIOD")]
    pub aggregation: Option<Granularity>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file path for the chart (.svg or .png)
    #[arg(long, value_name = "FILE")]
    pub chart: Option<PathBuf>,

    /// Do not render a chart
    #[arg(long, conflicts_with = "chart")]
    pub no_chart: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .vdash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Download timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print the available filter choices for the loaded data and exit
    #[arg(long)]
    pub list_options: bool,

    /// Exit with code 2 when no records match the filters
    ///
    /// Useful for scripts that should notice an empty selection.
    #[arg(long)]
    pub fail_on_empty: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .vdash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Chart file formats, picked from the chart path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFormat {
    Svg,
    Png,
}

impl ChartFormat {
    /// Detect the format from a file path.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "svg" => Some(ChartFormat::Svg),
            "png" => Some(ChartFormat::Png),
            _ => None,
        }
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("source", &self.source)
            .field("file", &self.file)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("location", &self.location)
            .field("bicycle", &self.bicycle)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("aggregation", &self.aggregation)
            .field("output", &self.output)
            .field("format", &self.format)
            .field("chart", &self.chart)
            .field("no_chart", &self.no_chart)
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .field("list_options", &self.list_options)
            .field("fail_on_empty", &self.fail_on_empty)
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .field("init_config", &self.init_config)
            .finish()
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate source URL format
        if let Some(ref source) = self.source {
            if !source.starts_with("http://") && !source.starts_with("https://") {
                return Err("Source URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        // Validate chart format
        if let Some(ref chart) = self.chart {
            if ChartFormat::from_path(chart).is_none() {
                return Err(format!(
                    "Chart path must end in .svg or .png: {}",
                    chart.display()
                ));
            }
        }

        // Validate local file if provided
        if let Some(ref file) = self.file {
            if !file.exists() {
                return Err(format!("Source file does not exist: {}", file.display()));
            }
            if !file.is_file() {
                return Err(format!("Source path is not a file: {}", file.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
