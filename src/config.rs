//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.vdash.toml` files.

use crate::models::{BicycleFilter, FilterCriteria, Granularity, LocationFilter, ALL};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".vdash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Record source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Column header names.
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Default filter selections.
    #[serde(default)]
    pub filters: FiltersConfig,

    /// Chart settings.
    #[serde(default)]
    pub chart: ChartConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Where records are loaded from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Spreadsheet or CSV URL.
    #[serde(default)]
    pub url: String,

    /// Download timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Header names of the columns the dashboard reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_timestamp_column")]
    pub timestamp: String,

    #[serde(default = "default_location_column")]
    pub location: String,

    #[serde(default = "default_violation_column")]
    pub violation_type: String,

    #[serde(default = "default_contact_column")]
    pub contact_type: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            timestamp: default_timestamp_column(),
            location: default_location_column(),
            violation_type: default_violation_column(),
            contact_type: default_contact_column(),
        }
    }
}

fn default_timestamp_column() -> String {
    "Date and Time".to_string()
}

fn default_location_column() -> String {
    "Location".to_string()
}

fn default_violation_column() -> String {
    "Violation Type".to_string()
}

fn default_contact_column() -> String {
    "Contact Type".to_string()
}

/// Filter selections used when the command line does not give one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersConfig {
    /// Location groups, or `["All"]`.
    #[serde(default = "default_locations")]
    pub locations: Vec<String>,

    /// `all`, `regular` or `e-bike`.
    #[serde(default)]
    pub bicycle: BicycleFilter,

    /// `daily`, `weekly` or `monthly`.
    #[serde(default)]
    pub aggregation: Granularity,

    /// Range start; the earliest observed date when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,

    /// Range end; the latest observed date when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            locations: default_locations(),
            bicycle: BicycleFilter::All,
            aggregation: Granularity::Monthly,
            start: None,
            end: None,
        }
    }
}

fn default_locations() -> Vec<String> {
    vec![ALL.to_string()]
}

impl FiltersConfig {
    /// Resolve these selections into pipeline criteria.
    ///
    /// Unset range bounds fall back to `bounds` (the observed date span),
    /// and to `today` when the data has no dated records at all.
    pub fn to_criteria(
        &self,
        bounds: Option<(NaiveDate, NaiveDate)>,
        today: NaiveDate,
    ) -> FilterCriteria {
        let (first, last) = bounds.unwrap_or((today, today));
        FilterCriteria {
            locations: LocationFilter::from_selection(&self.locations),
            bicycle: self.bicycle,
            start: self.start.unwrap_or(first),
            end: self.end.unwrap_or(last),
            granularity: self.aggregation,
        }
    }
}

/// Chart rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Write a chart at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Output path; `.svg` or `.png`.
    #[serde(default = "default_chart_path")]
    pub path: String,

    /// Width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Chart caption.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_chart_path(),
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_chart_path() -> String {
    "violations_chart.svg".to_string()
}

fn default_width() -> u32 {
    1200
}

fn default_height() -> u32 {
    600
}

fn default_title() -> String {
    "Violations by Contact Type".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "violations_report.md".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_if_exists(Path::new(CONFIG_FILE))
    }

    /// Load configuration from `path` if that file exists.
    pub fn load_if_exists(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.source {
            self.source.url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }

        // Filters - only override if provided
        if let Some(ref locations) = args.location {
            self.filters.locations = locations.clone();
        }
        if let Some(bicycle) = args.bicycle {
            self.filters.bicycle = bicycle;
        }
        if let Some(aggregation) = args.aggregation {
            self.filters.aggregation = aggregation;
        }
        if args.start.is_some() {
            self.filters.start = args.start;
        }
        if args.end.is_some() {
            self.filters.end = args.end;
        }

        // Outputs
        if let Some(ref output) = args.output {
            self.report.output = output.display().to_string();
        }
        if let Some(ref chart) = args.chart {
            self.chart.path = chart.display().to_string();
        }
        if args.no_chart {
            self.chart.enabled = false;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BicycleType;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.columns.timestamp, "Date and Time");
        assert_eq!(config.filters.locations, vec!["All"]);
        assert_eq!(config.filters.aggregation, Granularity::Monthly);
        assert_eq!(config.source.timeout_seconds, 30);
        assert!(config.chart.enabled);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[source]
url = "https://example.com/violations.csv"

[columns]
contact_type = "Contact"

[filters]
locations = ["Main St", "Broadway"]
bicycle = "e-bike"
aggregation = "weekly"
start = "2024-01-01"

[chart]
path = "out.png"
width = 800
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.source.url, "https://example.com/violations.csv");
        assert_eq!(config.source.timeout_seconds, 30);
        assert_eq!(config.columns.contact_type, "Contact");
        assert_eq!(config.columns.location, "Location");
        assert_eq!(config.filters.locations, vec!["Main St", "Broadway"]);
        assert_eq!(config.filters.bicycle, BicycleFilter::Only(BicycleType::EBike));
        assert_eq!(config.filters.aggregation, Granularity::Weekly);
        assert_eq!(config.filters.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(config.filters.end, None);
        assert_eq!(config.chart.path, "out.png");
        assert_eq!(config.chart.width, 800);
        assert_eq!(config.chart.height, 600);
    }

    #[test]
    fn test_parse_config_rejects_bad_bicycle() {
        let result: std::result::Result<Config, _> = toml::from_str("[filters]\nbicycle = \"tricycle\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[source]"));
        assert!(toml_str.contains("[columns]"));
        assert!(toml_str.contains("[filters]"));
        assert!(toml_str.contains("[chart]"));

        let round_trip: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(round_trip.filters.bicycle, BicycleFilter::All);
    }

    #[test]
    fn test_filters_to_criteria() {
        let first = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let last = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let mut filters = FiltersConfig::default();
        let criteria = filters.to_criteria(Some((first, last)), today);
        assert_eq!(criteria.locations, LocationFilter::All);
        assert_eq!(criteria.start, first);
        assert_eq!(criteria.end, last);
        assert_eq!(criteria.granularity, Granularity::Monthly);

        filters.locations = vec!["Broadway".to_string()];
        filters.end = NaiveDate::from_ymd_opt(2024, 2, 1);
        let criteria = filters.to_criteria(None, today);
        assert!(criteria.locations.matches("Broadway"));
        assert!(!criteria.locations.matches("Main St"));
        assert_eq!(criteria.start, today);
        assert_eq!(criteria.end, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[report]\noutput = \"custom.json\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.report.output, "custom.json");

        let missing = Config::load_if_exists(Path::new("/no/such/.vdash.toml")).unwrap();
        assert!(missing.is_none());
    }
}
