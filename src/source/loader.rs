//! Spreadsheet download and CSV parsing.
//!
//! The whole sheet is fetched in one request (or read from disk), parsed
//! with the header row naming the columns, and mapped onto [`RawRecord`]s.

use super::timestamp::parse_timestamp;
use super::SourceError;
use crate::config::ColumnsConfig;
use crate::models::RawRecord;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

const SHEETS_PREFIX: &str = "https://docs.google.com/spreadsheets/d/";

/// Where the records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// A CSV download (spreadsheet links are rewritten to their export URL).
    Url {
        url: String,
        /// Sent as `Authorization: Bearer <token>` when present.
        bearer_token: Option<String>,
    },
    /// A CSV file on disk.
    File(PathBuf),
}

impl SourceSpec {
    /// Human-readable description for logs and reports.
    pub fn describe(&self) -> String {
        match self {
            SourceSpec::Url { url, .. } => url.clone(),
            SourceSpec::File(path) => path.display().to_string(),
        }
    }
}

/// Options for loading records.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Header names of the columns to read.
    pub columns: ColumnsConfig,
    /// Download timeout in seconds.
    pub timeout_seconds: u64,
    /// Whether to show a spinner while downloading.
    pub show_progress: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            columns: ColumnsConfig::default(),
            timeout_seconds: 30,
            show_progress: false,
        }
    }
}

/// Load every raw record from the source.
pub async fn load_records(
    spec: &SourceSpec,
    options: &LoadOptions,
) -> Result<Vec<RawRecord>, SourceError> {
    let bytes = match spec {
        SourceSpec::Url { url, bearer_token } => {
            let url = sheet_export_url(url);
            download(&url, bearer_token.as_deref(), options).await?
        }
        SourceSpec::File(path) => {
            info!("Reading records from: {}", path.display());
            tokio::fs::read(path)
                .await
                .map_err(|source| SourceError::Io {
                    path: path.clone(),
                    source,
                })?
        }
    };

    debug!("Loaded {} bytes from {}", bytes.len(), spec.describe());
    parse_csv(&bytes, &options.columns)
}

/// Rewrite a Google Sheets link to its CSV export URL.
///
/// `…/spreadsheets/d/<ID>/edit#gid=<GID>` becomes
/// `…/spreadsheets/d/<ID>/export?format=csv&gid=<GID>`. Other URLs, and
/// links that already point at an export, are returned unchanged.
pub fn sheet_export_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix(SHEETS_PREFIX) else {
        return url.to_string();
    };

    let id: String = rest
        .chars()
        .take_while(|c| !matches!(c, '/' | '?' | '#'))
        .collect();
    if id.is_empty() || rest[id.len()..].starts_with("/export") {
        return url.to_string();
    }

    let gid = rest
        .find("gid=")
        .map(|pos| {
            rest[pos + 4..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
        })
        .filter(|gid| !gid.is_empty())
        .unwrap_or_else(|| "0".to_string());

    format!("{SHEETS_PREFIX}{id}/export?format=csv&gid={gid}")
}

async fn download(
    url: &str,
    bearer_token: Option<&str>,
    options: &LoadOptions,
) -> Result<Vec<u8>, SourceError> {
    info!("Downloading records from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(options.timeout_seconds))
        .build()?;

    let spinner = if options.show_progress {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Downloading spreadsheet...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let mut request = client.get(url);
    if let Some(token) = bearer_token {
        request = request.bearer_auth(token);
    }

    let result = fetch(request, url).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    result
}

async fn fetch(request: reqwest::RequestBuilder, url: &str) -> Result<Vec<u8>, SourceError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            status,
            url: url.to_string(),
        });
    }

    Ok(response.bytes().await?.to_vec())
}

/// Parse CSV bytes into raw records using the configured column names.
///
/// Only the timestamp column is required. Blank cells become `None`, and
/// unparseable timestamps are kept as `None` rather than failing the load.
pub fn parse_csv(bytes: &[u8], columns: &ColumnsConfig) -> Result<Vec<RawRecord>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let timestamp_col = find_column(&headers, &columns.timestamp)
        .ok_or_else(|| SourceError::MissingColumn(columns.timestamp.clone()))?;
    let location_col = find_optional(&headers, &columns.location);
    let violation_col = find_optional(&headers, &columns.violation_type);
    let contact_col = find_optional(&headers, &columns.contact_type);

    let mut records = Vec::new();
    let mut unparseable = 0usize;

    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let cell = |col: Option<usize>| -> Option<String> {
            col.and_then(|i| record.get(i))
                .filter(|value| !value.trim().is_empty())
                .map(String::from)
        };

        let timestamp_text = cell(Some(timestamp_col));
        let timestamp = timestamp_text.as_deref().and_then(parse_timestamp);
        if timestamp.is_none() {
            unparseable += 1;
            debug!(
                "Row {}: unparseable timestamp {:?}",
                row + 2,
                timestamp_text.unwrap_or_default()
            );
        }

        records.push(RawRecord {
            timestamp,
            location: cell(location_col),
            violation_type: cell(violation_col),
            contact_type: cell(contact_col),
        });
    }

    if records.is_empty() {
        return Err(SourceError::Empty);
    }

    if unparseable > 0 {
        warn!(
            "{} of {} rows have no parseable '{}' and will never match a date range",
            unparseable,
            records.len(),
            columns.timestamp
        );
    }

    info!("Parsed {} records", records.len());
    Ok(records)
}

/// Index of a header, matched exactly first and then case-insensitively.
fn find_column(headers: &[String], name: &str) -> Option<usize> {
    let name = name.trim();
    headers
        .iter()
        .position(|h| h == name)
        .or_else(|| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
}

fn find_optional(headers: &[String], name: &str) -> Option<usize> {
    let col = find_column(headers, name);
    if col.is_none() {
        warn!("Column '{}' not found; treating it as blank", name);
    }
    col
}
