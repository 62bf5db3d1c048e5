//! Filter, bucket and pivot violation records into chart-ready series.
//!
//! Every function here is pure over its inputs: the loaded records are
//! only ever borrowed, and each update produces a fresh [`Reshaped`].

use crate::models::{
    BicycleFilter, FilterCriteria, FilterOptions, Granularity, LocationFilter, PivotTable,
    Record, Reshaped, ALL,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// Run the pipeline with positional filter arguments.
pub fn reshape(
    records: &[Record],
    locations: &LocationFilter,
    bicycle: BicycleFilter,
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
) -> Reshaped {
    let criteria = FilterCriteria {
        locations: locations.clone(),
        bicycle,
        start,
        end,
        granularity,
    };
    reshape_with(records, &criteria)
}

/// Run the pipeline for one set of filter criteria.
#[instrument(skip(records, criteria), fields(record_count = records.len()))]
pub fn reshape_with(records: &[Record], criteria: &FilterCriteria) -> Reshaped {
    let filtered = filter_records(records, criteria);
    debug!("{} of {} records pass the filters", filtered.len(), records.len());

    if filtered.is_empty() {
        return Reshaped::Empty;
    }

    let table = pivot(&filtered, criteria.granularity);

    if table.column_totals().iter().all(|total| *total == 0) {
        debug!("Every contact-type column sums to zero");
        return Reshaped::Empty;
    }

    debug!(
        "Pivoted into {} periods x {} contact types",
        table.periods.len(),
        table.contact_types.len()
    );
    Reshaped::Table(table)
}

/// Apply the location, bicycle and date filters, in that order.
pub fn filter_records<'a>(records: &'a [Record], criteria: &FilterCriteria) -> Vec<&'a Record> {
    let (start, end) = criteria.date_range();

    records
        .iter()
        .filter(|r| criteria.locations.matches(&r.location_group))
        .filter(|r| criteria.bicycle.matches(r.bicycle_type))
        .filter(|r| match r.date() {
            Some(date) => start <= date && date <= end,
            None => false,
        })
        .collect()
}

/// Bucket key for a date at the given granularity.
///
/// Weeks start on Monday, months on their first day.
pub fn period_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    match granularity {
        Granularity::Daily => date,
        Granularity::Weekly => {
            let offset = date.weekday().num_days_from_monday();
            date - Duration::days(i64::from(offset))
        }
        Granularity::Monthly => date.with_day(1).unwrap_or(date),
    }
}

/// Count records per (period, contact type) and lay the counts out as a
/// dense table. Records without a date are skipped.
fn pivot(records: &[&Record], granularity: Granularity) -> PivotTable {
    let mut cells: BTreeMap<(NaiveDate, &str), u64> = BTreeMap::new();
    let mut periods = BTreeSet::new();
    let mut contact_types = BTreeSet::new();

    for record in records {
        let Some(date) = record.date() else {
            continue;
        };
        let period = period_start(date, granularity);
        periods.insert(period);
        contact_types.insert(record.contact_type.as_str());
        *cells.entry((period, record.contact_type.as_str())).or_insert(0) += 1;
    }

    let periods: Vec<NaiveDate> = periods.into_iter().collect();
    let contact_types: Vec<&str> = contact_types.into_iter().collect();

    let counts = periods
        .iter()
        .map(|period| {
            contact_types
                .iter()
                .map(|contact| cells.get(&(*period, *contact)).copied().unwrap_or(0))
                .collect()
        })
        .collect();

    PivotTable {
        granularity,
        periods,
        contact_types: contact_types.into_iter().map(String::from).collect(),
        counts,
    }
}

/// Earliest and latest calendar dates among the records.
pub fn date_bounds(records: &[Record]) -> Option<(NaiveDate, NaiveDate)> {
    let mut dates = records.iter().filter_map(Record::date);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

/// Choices a user can make against the loaded records.
pub fn filter_options(records: &[Record]) -> FilterOptions {
    let groups: BTreeSet<&str> = records.iter().map(|r| r.location_group.as_str()).collect();

    let mut locations = vec![ALL.to_string()];
    locations.extend(groups.into_iter().map(String::from));

    let bounds = date_bounds(records);

    FilterOptions {
        locations,
        bicycle_types: BicycleFilter::choices()
            .iter()
            .map(ToString::to_string)
            .collect(),
        granularities: Granularity::choices().to_vec(),
        default_start: bounds.map(|(start, _)| start),
        default_end: bounds.map(|(_, end)| end),
        record_count: records.len(),
        undated_count: records.iter().filter(|r| r.date().is_none()).count(),
    }
}
