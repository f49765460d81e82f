use std::io::Write;

use anyhow::{Context, Result};
use chrono::Timelike;

use super::model::{CellValue, Table};
use super::pipeline::ROLLING_AVG_COLUMN;

/// How each column's cells are rendered, decided once per column so every
/// row of a column uses the same convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnFormat {
    /// Every date in the column falls on midnight → write the date only.
    date_only: bool,
    /// Every cell is an integral number → write without a fraction. Never
    /// set for the rolling average, which is a float column by construction.
    integral: bool,
}

fn column_format(table: &Table, column: &str) -> ColumnFormat {
    let date_only = table
        .column(column)
        .filter_map(CellValue::as_date)
        .all(|d| d.num_seconds_from_midnight() == 0 && d.nanosecond() == 0);
    let integral = column != ROLLING_AVG_COLUMN
        && !table.is_empty()
        && table.column(column).all(|c| match c {
            CellValue::Number(v) => v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15,
            _ => false,
        });
    ColumnFormat { date_only, integral }
}

/// Shortest round-trip decimal form, always with a fractional digit
/// (`5.0`, `4.75`).
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

fn format_cell(cell: &CellValue, fmt: ColumnFormat) -> String {
    match cell {
        CellValue::Missing => String::new(),
        CellValue::Number(v) if fmt.integral => format!("{v:.0}"),
        CellValue::Number(v) => format_float(*v),
        CellValue::Date(d) if fmt.date_only => d.format("%Y-%m-%d").to_string(),
        CellValue::Date(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
        CellValue::Text(s) => s.clone(),
    }
}

/// Write a table as CSV: header in column order, then one line per row.
pub fn write_csv<W: Write>(table: &Table, sink: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    writer
        .write_record(&table.columns)
        .context("writing CSV header")?;

    let formats: Vec<ColumnFormat> = table
        .columns
        .iter()
        .map(|c| column_format(table, c))
        .collect();

    for (row_no, record) in table.records.iter().enumerate() {
        let fields = table
            .columns
            .iter()
            .zip(&formats)
            .map(|(col, fmt)| format_cell(record.get(col), *fmt));
        writer
            .write_record(fields)
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }
    writer.flush().context("flushing CSV output")?;
    Ok(())
}

/// Serialise the cleaned table to CSV bytes for download.
pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_csv;
    use crate::data::pipeline::{run, PipelineParams};

    fn export(text: &str) -> String {
        let raw = read_csv(text.as_bytes()).unwrap();
        let mut params = PipelineParams::new("date", "rate");
        params.window = crate::data::stats::RollingWindow::new(2).unwrap();
        let out = run(&raw, &params).unwrap();
        String::from_utf8(to_csv_bytes(&out.table).unwrap()).unwrap()
    }

    #[test]
    fn exports_cleaned_rows_with_rolling_column() {
        let csv = export("date,rate,id\n2024-02-01,4.5,2\n2024-01-01,5,1\nbad,1,3\n");
        assert_eq!(
            csv,
            "date,rate,id,RollingAvg\n\
             2024-01-01,5.0,1,\n\
             2024-02-01,4.5,2,4.75\n"
        );
    }

    #[test]
    fn float_columns_keep_a_fraction() {
        let csv = export("date,rate\n2024-01-01,5\n2024-02-01,bad\n2024-03-01,4\n");
        assert_eq!(
            csv,
            "date,rate,RollingAvg\n\
             2024-01-01,5.0,\n\
             2024-02-01,,\n\
             2024-03-01,4.0,\n"
        );
    }

    #[test]
    fn rolling_average_is_always_written_as_float() {
        let raw = read_csv("date,rate\n2024-01-01,5\n2024-02-01,4\n".as_bytes()).unwrap();
        let mut params = PipelineParams::new("date", "rate");
        params.window = crate::data::stats::RollingWindow::new(1).unwrap();
        let out = run(&raw, &params).unwrap();
        let csv = String::from_utf8(to_csv_bytes(&out.table).unwrap()).unwrap();
        assert_eq!(
            csv,
            "date,rate,RollingAvg\n\
             2024-01-01,5,5.0\n\
             2024-02-01,4,4.0\n"
        );
    }

    #[test]
    fn timestamps_keep_time_of_day() {
        let csv = export("date,rate\n2024-01-01T08:30:00,1.5\n2024-01-02,2.5\n");
        assert!(csv.contains("2024-01-01 08:30:00,1.5,"));
        assert!(csv.contains("2024-01-02 00:00:00,2.5,2.0"));
    }

    #[test]
    fn text_is_quoted_when_needed() {
        let csv = export("date,rate,region\n2024-01-01,1.5,\"Delhi, NCR\"\n");
        assert!(csv.contains("\"Delhi, NCR\""));
    }

    #[test]
    fn empty_table_exports_header_only() {
        let csv = export("date,rate\n");
        assert_eq!(csv, "date,rate,RollingAvg\n");
    }

    #[test]
    fn format_float_is_stable() {
        assert_eq!(format_float(5.0), "5.0");
        assert_eq!(format_float(4.75), "4.75");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
    }
}
