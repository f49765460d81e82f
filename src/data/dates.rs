use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::model::CellValue;

/// Date-time layouts tried in order. Month-first wins over day-first for
/// ambiguous slash/dash dates.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%B %d, %Y",
];

/// Parse a single date string, trying a fixed list of common layouts.
///
/// Accepts full timestamps, plain dates, year-month (`2024-03`, `Mar 2024`,
/// `March 2024`) and bare four-digit years. Month names may be abbreviated
/// or spelled out. Surrounding whitespace is ignored. Returns
/// `None` instead of erroring on anything unrecognised.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    // Year-month forms default to the first of the month.
    for (padded, fmt) in [
        (format!("{s}-01"), "%Y-%m-%d"),
        (format!("{s}/01"), "%Y/%m/%d"),
        (format!("1 {s}"), "%d %b %Y"),
        (format!("1 {s}"), "%d %B %Y"),
    ] {
        if let Ok(d) = NaiveDate::parse_from_str(&padded, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0);
    }

    None
}

/// Interpret a cell as a timestamp. Numbers go through their text form so a
/// CSV year column (`2024`) parses the same way the string would.
pub fn parse_cell(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => parse_date(s),
        CellValue::Number(v) if v.is_finite() => parse_date(&v.to_string()),
        CellValue::Number(_) | CellValue::Missing => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    #[test]
    fn parses_iso_and_slash_layouts() {
        assert_eq!(parse_date("2024-01-01"), Some(ymd(2024, 1, 1)));
        assert_eq!(parse_date(" 2024/02/29 "), Some(ymd(2024, 2, 29)));
        assert_eq!(parse_date("03/04/2024"), Some(ymd(2024, 3, 4)));
        assert_eq!(parse_date("31/05/2019"), Some(ymd(2019, 5, 31)));
        assert_eq!(parse_date("31-05-2019"), Some(ymd(2019, 5, 31)));
    }

    #[test]
    fn parses_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2010, 12, 1)
            .and_then(|d| d.and_hms_opt(8, 26, 0))
            .unwrap();
        assert_eq!(parse_date("2010-12-01T08:26:00"), Some(expected));
        assert_eq!(parse_date("2010-12-01 08:26"), Some(expected));
        assert_eq!(parse_date("2010-12-01T08:26:00Z"), Some(expected));
    }

    #[test]
    fn parses_partial_dates() {
        assert_eq!(parse_date("2024-03"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_date("Mar 2024"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_date("March 2024"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_date("Jan 15, 2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("2024"), Some(ymd(2024, 1, 1)));
    }

    #[test]
    fn parses_full_month_names() {
        assert_eq!(parse_date("January 2024"), Some(ymd(2024, 1, 1)));
        assert_eq!(parse_date("September 2019"), Some(ymd(2019, 9, 1)));
        assert_eq!(parse_date("15 January 2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("January 15, 2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("15 Jan 2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("Janember 2024"), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("bad"), None);
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date("2023-02-29"), None);
    }

    #[test]
    fn numeric_year_cell_parses() {
        assert_eq!(parse_cell(&CellValue::Number(2020.0)), Some(ymd(2020, 1, 1)));
        assert_eq!(parse_cell(&CellValue::Number(4.5)), None);
        assert_eq!(parse_cell(&CellValue::Missing), None);
    }
}
