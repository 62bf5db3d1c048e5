//! Data models for the violations dashboard.
//!
//! This module contains the core data structures used throughout the
//! application: raw and derived violation records, the filter criteria a
//! user picks, and the reshaped period × contact-type table.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Sentinel selection meaning "every location group".
pub const ALL: &str = "All";

/// Placeholder for a categorical field the source left blank.
pub const UNKNOWN: &str = "Unknown";

/// One violation report row as supplied by the data source.
///
/// Every attribute is optional: blank cells and unparseable timestamps are
/// carried as `None` rather than failing the load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Date and time of the report, in the sheet's own local representation.
    pub timestamp: Option<NaiveDateTime>,
    /// Hierarchical location, levels separated by `" : "`.
    pub location: Option<String>,
    /// Free-text violation description.
    pub violation_type: Option<String>,
    /// Contact type as typed into the sheet.
    pub contact_type: Option<String>,
}

impl RawRecord {
    /// Calendar date of the report, time of day discarded.
    pub fn date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date())
    }
}

/// Bicycle classification derived from the violation text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BicycleType {
    /// Anything not recognised as an electric bicycle.
    #[serde(rename = "Regular")]
    Regular,
    /// Electric bicycle.
    #[serde(rename = "E-Bike")]
    EBike,
}

impl fmt::Display for BicycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BicycleType::Regular => write!(f, "Regular"),
            BicycleType::EBike => write!(f, "E-Bike"),
        }
    }
}

/// A record together with its derived categorical fields.
///
/// Built once per load by [`crate::analysis::derive_record`] and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// The row as loaded.
    pub raw: RawRecord,
    /// Top-level location category.
    pub location_group: String,
    /// Regular or E-Bike.
    pub bicycle_type: BicycleType,
    /// Trimmed, title-cased contact type.
    pub contact_type: String,
}

impl Record {
    /// Calendar date of the underlying report.
    pub fn date(&self) -> Option<NaiveDate> {
        self.raw.date()
    }
}

/// Bicycle-type selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BicycleFilter {
    /// Keep every record.
    #[default]
    All,
    /// Keep only records of this type.
    Only(BicycleType),
}

impl BicycleFilter {
    /// Whether a record of the given type passes this filter.
    pub fn matches(&self, bicycle_type: BicycleType) -> bool {
        match self {
            BicycleFilter::All => true,
            BicycleFilter::Only(wanted) => *wanted == bicycle_type,
        }
    }

    /// Every selectable value, in menu order.
    pub fn choices() -> [BicycleFilter; 3] {
        [
            BicycleFilter::All,
            BicycleFilter::Only(BicycleType::Regular),
            BicycleFilter::Only(BicycleType::EBike),
        ]
    }
}

impl fmt::Display for BicycleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BicycleFilter::All => write!(f, "{}", ALL),
            BicycleFilter::Only(t) => write!(f, "{}", t),
        }
    }
}

impl FromStr for BicycleFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(BicycleFilter::All),
            "regular" => Ok(BicycleFilter::Only(BicycleType::Regular)),
            "e-bike" | "ebike" | "e_bike" => Ok(BicycleFilter::Only(BicycleType::EBike)),
            other => Err(format!(
                "Unknown bicycle type '{}' (expected all, regular or e-bike)",
                other
            )),
        }
    }
}

impl TryFrom<String> for BicycleFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BicycleFilter> for String {
    fn from(filter: BicycleFilter) -> Self {
        filter.to_string().to_lowercase()
    }
}

/// Location-group selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocationFilter {
    /// Keep every record.
    #[default]
    All,
    /// Keep records whose location group is in the set.
    Selected(BTreeSet<String>),
}

impl LocationFilter {
    /// Build a filter from a user selection.
    ///
    /// A selection containing `All` (any case) collapses to [`LocationFilter::All`].
    pub fn from_selection<I, S>(selection: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut groups = BTreeSet::new();
        for item in selection {
            let item = item.as_ref().trim();
            if item.eq_ignore_ascii_case(ALL) {
                return LocationFilter::All;
            }
            groups.insert(item.to_string());
        }
        LocationFilter::Selected(groups)
    }

    /// Whether a record in the given group passes this filter.
    pub fn matches(&self, group: &str) -> bool {
        match self {
            LocationFilter::All => true,
            LocationFilter::Selected(groups) => groups.contains(group),
        }
    }
}

impl fmt::Display for LocationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationFilter::All => write!(f, "{}", ALL),
            LocationFilter::Selected(groups) if groups.is_empty() => write!(f, "(none)"),
            LocationFilter::Selected(groups) => {
                let names: Vec<&str> = groups.iter().map(String::as_str).collect();
                write!(f, "{}", names.join(", "))
            }
        }
    }
}

/// Time bucket size used for aggregation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One bucket per calendar day.
    Daily,
    /// One bucket per ISO week, keyed by its Monday.
    Weekly,
    /// One bucket per calendar month, keyed by its first day.
    #[default]
    Monthly,
}

impl Granularity {
    /// Every selectable value, in menu order.
    pub fn choices() -> [Granularity; 3] {
        [Granularity::Daily, Granularity::Weekly, Granularity::Monthly]
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Daily => write!(f, "Daily"),
            Granularity::Weekly => write!(f, "Weekly"),
            Granularity::Monthly => write!(f, "Monthly"),
        }
    }
}

/// Everything a single dashboard update is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub locations: LocationFilter,
    pub bicycle: BicycleFilter,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
}

impl FilterCriteria {
    /// The inclusive date range with its bounds in ascending order.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        if self.start > self.end {
            (self.end, self.start)
        } else {
            (self.start, self.end)
        }
    }
}

/// Period × contact-type count matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotTable {
    /// Bucket size the periods were computed with.
    pub granularity: Granularity,
    /// Period keys, ascending.
    pub periods: Vec<NaiveDate>,
    /// Column names, ascending.
    pub contact_types: Vec<String>,
    /// `counts[row][column]`, one row per period.
    pub counts: Vec<Vec<u64>>,
}

impl PivotTable {
    /// Count for a period/contact-type pair, 0 if either is absent.
    #[cfg(test)]
    pub fn count(&self, period: NaiveDate, contact_type: &str) -> u64 {
        let row = self.periods.iter().position(|p| *p == period);
        let col = self.contact_types.iter().position(|c| c == contact_type);
        match (row, col) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    /// Sum of each column.
    pub fn column_totals(&self) -> Vec<u64> {
        let mut totals = vec![0; self.contact_types.len()];
        for row in &self.counts {
            for (total, count) in totals.iter_mut().zip(row) {
                *total += count;
            }
        }
        totals
    }

    /// Sum of each row (the height of each stacked bar).
    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Sum of every cell.
    pub fn total(&self) -> u64 {
        self.row_totals().iter().sum()
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reshaped {
    /// Chart-ready table.
    Table(PivotTable),
    /// Nothing matches the filters; nothing to render.
    Empty,
}

impl Reshaped {
    pub fn is_empty(&self) -> bool {
        matches!(self, Reshaped::Empty)
    }

    pub fn table(&self) -> Option<&PivotTable> {
        match self {
            Reshaped::Table(table) => Some(table),
            Reshaped::Empty => None,
        }
    }
}

/// The choices offered to a user for the currently loaded data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    /// `All` followed by every observed location group, sorted.
    pub locations: Vec<String>,
    /// Bicycle selectors.
    pub bicycle_types: Vec<String>,
    /// Aggregation choices.
    pub granularities: Vec<Granularity>,
    /// Earliest observed date; default range start.
    pub default_start: Option<NaiveDate>,
    /// Latest observed date; default range end.
    pub default_end: Option<NaiveDate>,
    /// Records loaded.
    pub record_count: usize,
    /// Records whose timestamp could not be parsed.
    pub undated_count: usize,
}

/// The filters a report was produced with, range already in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFilters {
    pub locations: String,
    pub bicycle: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub granularity: Granularity,
}

impl From<&FilterCriteria> for AppliedFilters {
    fn from(criteria: &FilterCriteria) -> Self {
        let (start, end) = criteria.date_range();
        Self {
            locations: criteria.locations.to_string(),
            bicycle: criteria.bicycle.to_string(),
            start,
            end,
            granularity: criteria.granularity,
        }
    }
}

/// Metadata about a dashboard report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// URL or path the records were loaded from.
    pub source: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Records loaded from the source.
    pub records_loaded: usize,
    /// Records that passed the filters.
    pub records_matched: u64,
    /// Effective filters.
    pub filters: AppliedFilters,
    /// Load + pipeline time in seconds.
    pub duration_seconds: f64,
}

/// One dashboard update: metadata plus the pipeline outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub result: Reshaped,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bicycle_filter_parse() {
        assert_eq!("All".parse::<BicycleFilter>(), Ok(BicycleFilter::All));
        assert_eq!(
            "regular".parse::<BicycleFilter>(),
            Ok(BicycleFilter::Only(BicycleType::Regular))
        );
        assert_eq!(
            "E-Bike".parse::<BicycleFilter>(),
            Ok(BicycleFilter::Only(BicycleType::EBike))
        );
        assert_eq!(
            "ebike".parse::<BicycleFilter>(),
            Ok(BicycleFilter::Only(BicycleType::EBike))
        );
        assert!("scooter".parse::<BicycleFilter>().is_err());
    }

    #[test]
    fn test_bicycle_filter_matches() {
        assert!(BicycleFilter::All.matches(BicycleType::EBike));
        assert!(BicycleFilter::All.matches(BicycleType::Regular));
        assert!(BicycleFilter::Only(BicycleType::EBike).matches(BicycleType::EBike));
        assert!(!BicycleFilter::Only(BicycleType::EBike).matches(BicycleType::Regular));
    }

    #[test]
    fn test_bicycle_display() {
        assert_eq!(BicycleType::EBike.to_string(), "E-Bike");
        assert_eq!(BicycleFilter::All.to_string(), "All");
        assert_eq!(String::from(BicycleFilter::Only(BicycleType::EBike)), "e-bike");
    }

    #[test]
    fn test_location_filter_from_selection() {
        assert_eq!(
            LocationFilter::from_selection(["Main St", "all"]),
            LocationFilter::All
        );

        let filter = LocationFilter::from_selection([" Main St ", "Broadway"]);
        assert!(filter.matches("Main St"));
        assert!(filter.matches("Broadway"));
        assert!(!filter.matches("Elm St"));

        let nothing = LocationFilter::from_selection(Vec::<String>::new());
        assert!(!nothing.matches("Main St"));
        assert_eq!(nothing.to_string(), "(none)");
    }

    #[test]
    fn test_date_range_is_ordered() {
        let criteria = FilterCriteria {
            locations: LocationFilter::All,
            bicycle: BicycleFilter::All,
            start: date(2024, 2, 1),
            end: date(2024, 1, 1),
            granularity: Granularity::Monthly,
        };
        assert_eq!(criteria.date_range(), (date(2024, 1, 1), date(2024, 2, 1)));
    }

    #[test]
    fn test_pivot_table_totals() {
        let table = PivotTable {
            granularity: Granularity::Daily,
            periods: vec![date(2024, 1, 1), date(2024, 1, 2)],
            contact_types: vec!["Officer".to_string(), "Warning".to_string()],
            counts: vec![vec![2, 0], vec![1, 3]],
        };

        assert_eq!(table.column_totals(), vec![3, 3]);
        assert_eq!(table.row_totals(), vec![2, 4]);
        assert_eq!(table.total(), 6);
        assert_eq!(table.count(date(2024, 1, 2), "Warning"), 3);
        assert_eq!(table.count(date(2024, 1, 3), "Warning"), 0);
    }

    #[test]
    fn test_reshaped_json_shape() {
        let empty = serde_json::to_value(Reshaped::Empty).unwrap();
        assert_eq!(empty["status"], "empty");

        let table = Reshaped::Table(PivotTable {
            granularity: Granularity::Monthly,
            periods: vec![date(2024, 1, 1)],
            contact_types: vec!["Officer".to_string()],
            counts: vec![vec![2]],
        });
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["status"], "table");
        assert_eq!(value["granularity"], "monthly");
        assert_eq!(value["periods"][0], "2024-01-01");
    }

    #[test]
    fn test_applied_filters_swap_range() {
        let criteria = FilterCriteria {
            locations: LocationFilter::from_selection(["Main St"]),
            bicycle: BicycleFilter::Only(BicycleType::EBike),
            start: date(2024, 3, 1),
            end: date(2024, 1, 1),
            granularity: Granularity::Weekly,
        };
        let applied = AppliedFilters::from(&criteria);
        assert_eq!(applied.start, date(2024, 1, 1));
        assert_eq!(applied.end, date(2024, 3, 1));
        assert_eq!(applied.locations, "Main St");
        assert_eq!(applied.bicycle, "E-Bike");
    }
}
