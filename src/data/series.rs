use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::model::{CellValue, Table};
use super::pipeline::ROLLING_AVG_COLUMN;

/// One chart line: a label and `(date, value)` points in date order.
/// Missing values stay in the sequence so the line can break there.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    /// Region value the series was grouped by, if any.
    pub key: Option<CellValue>,
    pub points: Vec<(NaiveDateTime, Option<f64>)>,
}

impl Series {
    /// Contiguous runs of present values. A missing value ends a run.
    pub fn segments(&self) -> Vec<Vec<(NaiveDateTime, f64)>> {
        let mut runs = Vec::new();
        let mut current = Vec::new();
        for (t, v) in &self.points {
            match v {
                Some(v) => current.push((*t, *v)),
                None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
                None => {}
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }
}

fn points(table: &Table, date_column: &str, value_column: &str) -> Vec<(NaiveDateTime, Option<f64>)> {
    table
        .records
        .iter()
        .filter_map(|r| Some((r.get(date_column).as_date()?, r.get(value_column).as_f64())))
        .collect()
}

/// Rate over time. One series per distinct region value when a region
/// column is given, otherwise a single "Overall" series.
pub fn trend_series(
    table: &Table,
    date_column: &str,
    rate_column: &str,
    region_column: Option<&str>,
) -> Vec<Series> {
    let Some(region_column) = region_column else {
        return vec![Series {
            label: "Overall".to_string(),
            key: None,
            points: points(table, date_column, rate_column),
        }];
    };

    let mut groups: BTreeMap<CellValue, Vec<(NaiveDateTime, Option<f64>)>> = BTreeMap::new();
    for r in &table.records {
        if let Some(t) = r.get(date_column).as_date() {
            groups
                .entry(r.get(region_column).clone())
                .or_default()
                .push((t, r.get(rate_column).as_f64()));
        }
    }

    groups
        .into_iter()
        .map(|(key, points)| Series {
            label: key.to_string(),
            key: Some(key),
            points,
        })
        .collect()
}

/// The rate and its rolling average, for the overlay chart.
pub fn rolling_series(table: &Table, date_column: &str, rate_column: &str) -> [Series; 2] {
    [
        Series {
            label: rate_column.to_string(),
            key: None,
            points: points(table, date_column, rate_column),
        },
        Series {
            label: ROLLING_AVG_COLUMN.to_string(),
            key: None,
            points: points(table, date_column, ROLLING_AVG_COLUMN),
        },
    ]
}
