use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// DateRange – inclusive bounds on the parsed date column
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` timestamp range. `start <= end` always holds,
/// including for deserialized ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RangeBounds")]
pub struct DateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

#[derive(Deserialize)]
struct RangeBounds {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl From<RangeBounds> for DateRange {
    fn from(bounds: RangeBounds) -> Self {
        DateRange::new(bounds.start, bounds.end)
    }
}

impl DateRange {
    /// Build a range, swapping the bounds if they arrive reversed.
    pub fn new(a: NaiveDateTime, b: NaiveDateTime) -> Self {
        if a <= b {
            DateRange { start: a, end: b }
        } else {
            DateRange { start: b, end: a }
        }
    }

    /// Whole-day range: `start` at midnight through the last second of `end`.
    pub fn from_days(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        Some(Self::new(
            start.and_hms_opt(0, 0, 0)?,
            end.and_hms_opt(23, 59, 59)?,
        ))
    }

    /// Min/max of the already-parsed date column, `None` when it holds no dates.
    pub fn spanning(table: &Table, date_column: &str) -> Option<Self> {
        let mut dates = table.column(date_column).filter_map(CellValue::as_date);
        let first = dates.next()?;
        let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(DateRange { start: min, end: max })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }
}

// ---------------------------------------------------------------------------
// Row filters
// ---------------------------------------------------------------------------

/// Retain rows whose parsed date lies inside `range` (inclusive).
///
/// Rows whose date cell is not a parsed `Date` are dropped; after
/// `parse_dates` there are none.
pub fn filter_by_date_range(mut table: Table, date_column: &str, range: &DateRange) -> Table {
    table.records.retain(|r| r.get(date_column).as_date().is_some_and(|d| range.contains(d)));
    table
}

/// Selected region values. `None` means "no constraint" (show every region).
pub type RegionSelection = Option<BTreeSet<CellValue>>;

/// Retain rows whose region value is in the selection.
///
/// * `selection` is `None` → every row passes
/// * The selected set is empty → nothing selected → every row fails
/// * Otherwise the row's value (possibly `Missing`) must be in the set
pub fn filter_by_regions(mut table: Table, region_column: &str, selection: &RegionSelection) -> Table {
    if let Some(selected) = selection {
        table.records.retain(|r| selected.contains(r.get(region_column)));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Record;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    #[test]
    fn deserialized_range_is_ordered() {
        let json = r#"{"start":"2024-03-01T00:00:00","end":"2024-01-01T00:00:00"}"#;
        let range: DateRange = serde_json::from_str(json).unwrap();
        assert_eq!(range.start(), day(2024, 1, 1));
        assert_eq!(range.end(), day(2024, 3, 1));
        assert!(range.contains(day(2024, 2, 1)));
    }

    fn dated_table(days: &[(NaiveDateTime, &str)]) -> Table {
        let records = days
            .iter()
            .map(|(d, region)| {
                [
                    ("date", CellValue::Date(*d)),
                    ("region", CellValue::Text(region.to_string())),
                ]
                .into_iter()
                .collect::<Record>()
            })
            .collect();
        Table::new(vec!["date".into(), "region".into()], records)
    }

    #[test]
    fn reversed_bounds_are_swapped() {
        let range = DateRange::new(day(2024, 3, 1), day(2024, 1, 1));
        assert_eq!(range.start(), day(2024, 1, 1));
        assert_eq!(range.end(), day(2024, 3, 1));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let table = dated_table(&[
            (day(2024, 1, 1), "A"),
            (day(2024, 2, 1), "A"),
            (day(2024, 3, 1), "A"),
            (day(2024, 4, 1), "A"),
        ]);
        let range = DateRange::new(day(2024, 2, 1), day(2024, 3, 1));
        let filtered = filter_by_date_range(table, "date", &range);
        let kept: Vec<_> = filtered.column("date").filter_map(CellValue::as_date).collect();
        assert_eq!(kept, vec![day(2024, 2, 1), day(2024, 3, 1)]);
    }

    #[test]
    fn whole_day_range_keeps_afternoon_rows() {
        let afternoon = NaiveDate::from_ymd_opt(2024, 1, 31)
            .and_then(|d| d.and_hms_opt(15, 30, 0))
            .unwrap();
        let table = dated_table(&[(afternoon, "A")]);
        let range = DateRange::from_days(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        assert_eq!(filter_by_date_range(table, "date", &range).len(), 1);
    }

    #[test]
    fn spanning_finds_min_and_max() {
        let table = dated_table(&[
            (day(2024, 5, 1), "A"),
            (day(2023, 1, 1), "A"),
            (day(2024, 2, 1), "A"),
        ]);
        let span = DateRange::spanning(&table, "date").unwrap();
        assert_eq!(span.start(), day(2023, 1, 1));
        assert_eq!(span.end(), day(2024, 5, 1));
        assert!(DateRange::spanning(&Table::default(), "date").is_none());
    }

    #[test]
    fn region_selection_semantics() {
        let table = dated_table(&[
            (day(2024, 1, 1), "North"),
            (day(2024, 1, 1), "South"),
            (day(2024, 2, 1), "North"),
        ]);

        let all = filter_by_regions(table.clone(), "region", &None);
        assert_eq!(all.len(), 3);

        let none = filter_by_regions(table.clone(), "region", &Some(BTreeSet::new()));
        assert!(none.is_empty());

        let north: BTreeSet<_> = [CellValue::Text("North".into())].into_iter().collect();
        let only_north = filter_by_regions(table, "region", &Some(north));
        assert_eq!(only_north.len(), 2);
    }
}
