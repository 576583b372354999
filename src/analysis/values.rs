use crate::domain::model::{Record, Table};
use crate::utils::error::{DepotError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

// Slash dates are month-first; day-first is only tried when that fails.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d-%b-%Y", "%d %b %Y", "%d.%m.%Y",
];

/// Lenient date-time coercion. Unparseable input is `None`, never an error.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

pub fn record_datetime(record: &Record, column: &str) -> Option<NaiveDateTime> {
    record.text(column).as_deref().and_then(parse_datetime)
}

/// Whole days between two instants, floored like a calendar difference.
pub fn floor_days(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_seconds().div_euclid(86_400)
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

pub fn require_columns(table: &Table, columns: &[&str], source_name: &str) -> Result<()> {
    match columns.iter().find(|c| !table.has_column(c)) {
        Some(missing) => Err(DepotError::missing_column(missing, source_name)),
        None => Ok(()),
    }
}

/// Exact, trimmed match against an optional selection. `None` selects everything.
pub fn matches_selection(record: &Record, column: &str, selection: Option<&str>) -> bool {
    match selection {
        None => true,
        Some(wanted) => record.text(column).as_deref() == Some(wanted.trim()),
    }
}

/// Membership in a multi-select. An empty selection selects everything.
pub fn matches_any(record: &Record, column: &str, selection: &[String]) -> bool {
    if selection.is_empty() {
        return true;
    }
    record
        .text(column)
        .map(|value| selection.iter().any(|s| s.trim() == value))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_iso_dates() {
        assert_eq!(parse_datetime("2025-03-04"), Some(dt(2025, 3, 4, 0, 0)));
        assert_eq!(
            parse_datetime("2025-03-04 10:30:00"),
            Some(dt(2025, 3, 4, 10, 30))
        );
        assert_eq!(
            parse_datetime("2025-03-04T10:30:00.250"),
            parse_datetime("2025-03-04 10:30:00.250")
        );
    }

    #[test]
    fn test_slash_dates_are_month_first_with_fallback() {
        assert_eq!(parse_datetime("03/04/2025"), Some(dt(2025, 3, 4, 0, 0)));
        assert_eq!(parse_datetime("25/04/2025"), Some(dt(2025, 4, 25, 0, 0)));
        assert_eq!(parse_datetime("04-Mar-2025"), Some(dt(2025, 3, 4, 0, 0)));
    }

    #[test]
    fn test_unparseable_dates_are_missing() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("   "), None);
        assert_eq!(parse_datetime("not a date"), None);
        assert_eq!(parse_datetime("2025-13-40"), None);
    }

    #[test]
    fn test_floor_days() {
        assert_eq!(floor_days(dt(2025, 1, 1, 0, 0), dt(2025, 1, 3, 23, 0)), 2);
        assert_eq!(floor_days(dt(2025, 1, 1, 12, 0), dt(2025, 1, 1, 0, 0)), -1);
        assert_eq!(floor_days(dt(2025, 1, 1, 0, 0), dt(2025, 1, 1, 0, 0)), 0);
    }

    #[test]
    fn test_round_and_mean() {
        assert_eq!(round_to(66.666_666, 2), 66.67);
        assert_eq!(round_to(12.25, 1), 12.3);
        assert_eq!(mean(vec![1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(mean(Vec::<f64>::new()), None);
        assert_eq!(percentage(1, 0), 0.0);
    }

    #[test]
    fn test_selection_helpers() {
        let record = Record::new().with("Port", "AEJEA");
        assert!(matches_selection(&record, "Port", None));
        assert!(matches_selection(&record, "Port", Some(" AEJEA ")));
        assert!(!matches_selection(&record, "Port", Some("AEAUH")));
        assert!(matches_any(&record, "Port", &[]));
        assert!(matches_any(&record, "Port", &["X".into(), "AEJEA".into()]));
        assert!(!matches_any(&record, "Other", &["AEJEA".into()]));
    }
}
