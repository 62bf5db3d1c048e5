//! Derived categorical fields.
//!
//! Each rule is a small pure function so it can be tested on its own,
//! without running the full pipeline.

use crate::models::{BicycleType, RawRecord, Record, UNKNOWN};

/// Separator between levels of a hierarchical location.
pub const LOCATION_DELIMITER: &str = " : ";

/// Violation-text markers that identify an electric bicycle.
const EBIKE_MARKERS: [&str; 2] = ["ELECTRIC BICYCLES", "EBIKE"];

/// Top-level location group: the text before the first `" : "`, trimmed.
///
/// A location without the delimiter is its own group. An absent location
/// is `Unknown`. Groups are trimmed, matching how selections are read.
pub fn location_group(location: Option<&str>) -> String {
    match location {
        Some(location) => location
            .split(LOCATION_DELIMITER)
            .next()
            .unwrap_or(location)
            .trim()
            .to_string(),
        None => UNKNOWN.to_string(),
    }
}

/// E-Bike if the violation text mentions an electric bicycle, in any case.
pub fn bicycle_type(violation_type: Option<&str>) -> BicycleType {
    let Some(text) = violation_type else {
        return BicycleType::Regular;
    };

    let upper = text.to_uppercase();
    if EBIKE_MARKERS.iter().any(|marker| upper.contains(marker)) {
        BicycleType::EBike
    } else {
        BicycleType::Regular
    }
}

/// Trimmed, title-cased contact type; `Unknown` when blank.
pub fn normalize_contact_type(contact_type: Option<&str>) -> String {
    match contact_type.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => title_case(trimmed),
        _ => UNKNOWN.to_string(),
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
///
/// `"  pOLICE officer"` becomes `"  Police Officer"`, `"o'neil"` becomes
/// `"O'Neil"`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}

/// Compute every derived field of one raw record.
pub fn derive_record(raw: RawRecord) -> Record {
    let location_group = location_group(raw.location.as_deref());
    let bicycle_type = bicycle_type(raw.violation_type.as_deref());
    let contact_type = normalize_contact_type(raw.contact_type.as_deref());

    Record {
        raw,
        location_group,
        bicycle_type,
        contact_type,
    }
}

/// Derive every record of a freshly loaded set.
pub fn derive_all(raw: Vec<RawRecord>) -> Vec<Record> {
    raw.into_iter().map(derive_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_group_before_first_delimiter() {
        assert_eq!(location_group(Some("Main St : North")), "Main St");
        assert_eq!(location_group(Some("Park : Gate 2 : East")), "Park");
    }

    #[test]
    fn test_location_group_without_delimiter() {
        assert_eq!(location_group(Some("Broadway")), "Broadway");
        // A bare colon is not the delimiter.
        assert_eq!(location_group(Some("Pier:7")), "Pier:7");
        assert_eq!(location_group(Some("")), "");
    }

    #[test]
    fn test_location_group_trims_whitespace() {
        assert_eq!(location_group(Some("Main St ")), "Main St");
        assert_eq!(location_group(Some("  Main St  : North")), "Main St");
    }

    #[test]
    fn test_location_group_absent() {
        assert_eq!(location_group(None), "Unknown");
    }

    #[test]
    fn test_location_group_leading_delimiter() {
        assert_eq!(location_group(Some(" : North")), "");
    }

    #[test]
    fn test_bicycle_type_markers() {
        assert_eq!(
            bicycle_type(Some("ELECTRIC BICYCLES illegal use")),
            BicycleType::EBike
        );
        assert_eq!(bicycle_type(Some("riding an ebike on sidewalk")), BicycleType::EBike);
        assert_eq!(bicycle_type(Some("Electric Bicycles prohibited")), BicycleType::EBike);
        assert_eq!(bicycle_type(Some("E-Bike speeding")), BicycleType::Regular);
        assert_eq!(bicycle_type(Some("Speeding")), BicycleType::Regular);
        assert_eq!(bicycle_type(Some("")), BicycleType::Regular);
        assert_eq!(bicycle_type(None), BicycleType::Regular);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("officer"), "Officer");
        assert_eq!(title_case("pOLICE officer"), "Police Officer");
        assert_eq!(title_case("o'neil"), "O'Neil");
        assert_eq!(title_case("3rd party"), "3Rd Party");
        assert_eq!(title_case("walk-up"), "Walk-Up");
    }

    #[test]
    fn test_normalize_contact_type() {
        assert_eq!(normalize_contact_type(Some(" officer ")), "Officer");
        assert_eq!(normalize_contact_type(Some("VERBAL WARNING")), "Verbal Warning");
        assert_eq!(normalize_contact_type(Some("   ")), "Unknown");
        assert_eq!(normalize_contact_type(None), "Unknown");
    }

    #[test]
    fn test_derive_record() {
        let raw = RawRecord {
            timestamp: None,
            location: Some("Main St : North".to_string()),
            violation_type: Some("EBIKE on path".to_string()),
            contact_type: Some(" officer ".to_string()),
        };

        let record = derive_record(raw.clone());
        assert_eq!(record.location_group, "Main St");
        assert_eq!(record.bicycle_type, BicycleType::EBike);
        assert_eq!(record.contact_type, "Officer");
        assert_eq!(record.raw, raw);
    }

    #[test]
    fn test_derive_is_deterministic() {
        let raw = RawRecord {
            timestamp: None,
            location: None,
            violation_type: None,
            contact_type: None,
        };
        assert_eq!(derive_record(raw.clone()), derive_record(raw));
    }
}
