use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CellValue – a single cell of the loaded table
// ---------------------------------------------------------------------------

/// A loosely-typed table cell. Loaders only produce `Number`, `Text` and
/// `Missing`; `Date` appears once the date column has been parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
    Missing,
}

// -- Manual Eq/Ord/Hash so region values can live in a BTreeSet --
// Equality goes through `cmp`: numbers compare by `total_cmp`, which agrees
// with hashing their bits.

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Missing => 0,
                Number(_) => 1,
                Date(_) => 2,
                Text(_) => 3,
            }
        }
        match (self, other) {
            (Missing, Missing) => Ordering::Equal,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Number(v) => v.to_bits().hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Text(s) => s.hash(state),
            CellValue::Missing => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Missing => write!(f, "<missing>"),
        }
    }
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// The numeric payload, if this is a `Number`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// The parsed timestamp, if this is a `Date`.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the table
// ---------------------------------------------------------------------------

/// One table row: column name → value. Columns absent from the map read as
/// [`CellValue::Missing`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub cells: BTreeMap<String, CellValue>,
}

static MISSING: CellValue = CellValue::Missing;

impl Record {
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&MISSING)
    }

    pub fn set(&mut self, column: &str, value: CellValue) {
        self.cells.insert(column.to_string(), value);
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        Record {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// An in-memory table with an explicit column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column names in source order.
    pub columns: Vec<String>,
    /// All rows.
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Table { columns, records }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Iterate over one column's cells in row order.
    pub fn column<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.records.iter().map(move |r| r.get(column))
    }

    /// Append a column, or overwrite it if it already exists.
    ///
    /// `values` must have one entry per row.
    pub fn put_column(&mut self, column: &str, values: Vec<CellValue>) {
        debug_assert_eq!(values.len(), self.records.len());
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
        for (record, value) in self.records.iter_mut().zip(values) {
            record.set(column, value);
        }
    }

    /// Sorted set of distinct values in a column.
    pub fn unique_values(&self, column: &str) -> BTreeSet<CellValue> {
        self.column(column).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn missing_sorts_before_numbers_and_text() {
        let mut values = vec![
            CellValue::Text("b".into()),
            CellValue::Number(2.0),
            CellValue::Missing,
            CellValue::Text("a".into()),
            CellValue::Number(-1.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                CellValue::Missing,
                CellValue::Number(-1.0),
                CellValue::Number(2.0),
                CellValue::Text("a".into()),
                CellValue::Text("b".into()),
            ]
        );
    }

    #[test]
    fn equality_agrees_with_ordering_and_hashing() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        fn hash_of(v: &CellValue) -> u64 {
            let mut h = DefaultHasher::new();
            v.hash(&mut h);
            h.finish()
        }

        let nan = CellValue::Number(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(nan.cmp(&nan.clone()), Ordering::Equal);

        let pos = CellValue::Number(0.0);
        let neg = CellValue::Number(-0.0);
        assert_ne!(pos, neg);
        assert_ne!(pos.cmp(&neg), Ordering::Equal);
        assert_ne!(hash_of(&pos), hash_of(&neg));

        let set: BTreeSet<_> = [pos, neg, nan.clone(), nan].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn absent_column_reads_as_missing() {
        let record: Record = [("rate", CellValue::Number(4.2))].into_iter().collect();
        assert_eq!(record.get("rate"), &CellValue::Number(4.2));
        assert!(record.get("region").is_missing());
    }

    #[test]
    fn put_column_appends_once_and_overwrites() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let mut table = Table::new(
            vec!["date".into()],
            vec![[("date", CellValue::Date(date))].into_iter().collect::<Record>()],
        );
        table.put_column("RollingAvg", vec![CellValue::Missing]);
        table.put_column("RollingAvg", vec![CellValue::Number(1.5)]);
        assert_eq!(table.columns, vec!["date", "RollingAvg"]);
        assert_eq!(table.records[0].get("RollingAvg"), &CellValue::Number(1.5));
    }

    #[test]
    fn unique_values_deduplicates() {
        let records = ["North", "South", "North"]
            .iter()
            .map(|r| {
                [("region", CellValue::Text(r.to_string()))]
                    .into_iter()
                    .collect::<Record>()
            })
            .collect();
        let table = Table::new(vec!["region".into()], records);
        let unique = table.unique_values("region");
        assert_eq!(unique.len(), 2);
        assert_eq!(unique.first(), Some(&CellValue::Text("North".into())));
    }
}
