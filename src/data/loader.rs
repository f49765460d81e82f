use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use arrow::util::display::array_value_to_string;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Record, Table};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, comma separated (the usual upload)
/// * `.json`    – `[{ "date": "...", "rate": 5.1, ... }, ...]`
/// * `.parquet` – flat scalar columns
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            read_csv(file)?
        }
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    log::debug!(
        "{}: {} rows, columns {:?}",
        path.display(),
        table.len(),
        table.columns
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Read CSV from any byte source: header row, then data rows.
///
/// Rows may be ragged: cells past the end of a short row read as missing,
/// and cells past the header width are ignored. Every cell is type-guessed
/// on its own; a column can mix numbers and text.
pub fn read_csv<R: Read>(source: R) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(source);
    let headers = dedupe_headers(
        reader
            .headers()
            .context("reading CSV headers")?
            .iter()
            .map(|h| h.trim().to_string()),
    );

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let record: Record = headers
            .iter()
            .enumerate()
            .map(|(col_idx, name)| {
                let cell = row.get(col_idx).map_or(CellValue::Missing, guess_cell_type);
                (name.clone(), cell)
            })
            .collect();
        records.push(record);
    }

    Ok(Table::new(headers, records))
}

/// Repeated header names get a `.1`, `.2`, … suffix so no column shadows
/// another.
fn dedupe_headers(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let mut unique = name.clone();
        let mut n = 1;
        while out.contains(&unique) {
            unique = format!("{name}.{n}");
            n += 1;
        }
        if unique != name {
            log::debug!("duplicate column '{name}' renamed to '{unique}'");
        }
        out.push(unique);
    }
    out
}

/// Tokens read as missing in addition to empty cells.
const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Best-effort typing of a raw text cell.
pub fn guess_cell_type(s: &str) -> CellValue {
    let trimmed = s.trim();
    if trimmed.is_empty() || NA_TOKENS.contains(&trimmed) {
        return CellValue::Missing;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_nan() => CellValue::Missing,
        Ok(v) => CellValue::Number(v),
        Err(_) => CellValue::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "date": "2024-01-01", "rate": 5.0, "region": "North" },
///   ...
/// ]
/// ```
///
/// Column order follows first appearance across the records.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    read_json(&text)
}

pub fn read_json(text: &str) -> Result<Table> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let rows = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut record = Record::default();
        for (key, val) in obj {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
            record.set(key, json_to_cell(val));
        }
        records.push(record);
    }

    Ok(Table::new(columns, records))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::Number(n) => n.as_f64().map_or(CellValue::Missing, CellValue::Number),
        JsonValue::String(s) => guess_cell_type(s),
        JsonValue::Null => CellValue::Missing,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat scalar columns.
///
/// 32/64-bit integer and float columns become numbers directly. Every
/// other type (narrow integers, dates, timestamps, booleans) goes through
/// its Arrow display text and is type-guessed like a CSV cell.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let record: Record = columns
                .iter()
                .enumerate()
                .map(|(col_idx, name)| (name.clone(), extract_cell(batch.column(col_idx), row)))
                .collect();
            records.push(record);
        }
    }

    Ok(Table::new(columns, records))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Missing;
    }
    match col.data_type() {
        DataType::Utf8 => match col.as_any().downcast_ref::<StringArray>() {
            Some(s) => guess_cell_type(s.value(row)),
            None => CellValue::Missing,
        },
        DataType::LargeUtf8 => guess_cell_type(col.as_string::<i64>().value(row)),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map_or(CellValue::Missing, |a| CellValue::Number(a.value(row) as f64)),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map_or(CellValue::Missing, |a| CellValue::Number(a.value(row) as f64)),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map_or(CellValue::Missing, |a| match a.value(row) {
                v if v.is_nan() => CellValue::Missing,
                v => CellValue::Number(v as f64),
            }),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map_or(CellValue::Missing, |a| match a.value(row) {
                v if v.is_nan() => CellValue::Missing,
                v => CellValue::Number(v),
            }),
        _ => match array_value_to_string(col, row) {
            Ok(s) => guess_cell_type(&s),
            Err(e) => {
                log::warn!("row {row}: unreadable {:?} cell: {e}", col.data_type());
                CellValue::Missing
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_cells_are_type_guessed() {
        let data = "date,rate,region\n2024-01-01,5.0,North\n2024-02-01,bad,\n";
        let table = read_csv(data.as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["date", "rate", "region"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].get("rate"), &CellValue::Number(5.0));
        assert_eq!(table.records[1].get("rate"), &CellValue::Text("bad".into()));
        assert!(table.records[1].get("region").is_missing());
        assert_eq!(table.records[0].get("date"), &CellValue::Text("2024-01-01".into()));
    }

    #[test]
    fn csv_tolerates_ragged_rows() {
        let data = "a,b,c\n1,2\n1,2,3,4\n";
        let table = read_csv(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.records[0].get("c").is_missing());
        assert_eq!(table.records[1].get("c"), &CellValue::Number(3.0));
        assert_eq!(table.columns.len(), 3);
    }

    #[test]
    fn header_only_csv_is_empty_table() {
        let table = read_csv("date,rate\n".as_bytes()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns, vec!["date", "rate"]);
    }

    #[test]
    fn guess_handles_whitespace_and_nan() {
        assert_eq!(guess_cell_type(" 4.5 "), CellValue::Number(4.5));
        assert_eq!(guess_cell_type("   "), CellValue::Missing);
        assert_eq!(guess_cell_type("NaN"), CellValue::Missing);
        assert_eq!(guess_cell_type("bad"), CellValue::Text("bad".into()));
    }

    #[test]
    fn common_na_tokens_read_as_missing() {
        for token in ["NA", "N/A", "n/a", "null", "NULL", "None", "#N/A", "nan", "-NaN", "<NA>", " NA "] {
            assert_eq!(guess_cell_type(token), CellValue::Missing, "{token:?}");
        }
        assert_eq!(guess_cell_type("NAB"), CellValue::Text("NAB".into()));
        assert_eq!(guess_cell_type("none"), CellValue::Text("none".into()));
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let table = read_csv("date,rate,rate,rate.1\n2024-01-01,1,2,3\n".as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["date", "rate", "rate.1", "rate.1.1"]);
        assert_eq!(table.records[0].get("rate"), &CellValue::Number(1.0));
        assert_eq!(table.records[0].get("rate.1"), &CellValue::Number(2.0));
        assert_eq!(table.records[0].get("rate.1.1"), &CellValue::Number(3.0));
    }

    #[test]
    fn json_records_load_in_first_seen_order() {
        let text = r#"[
            {"rate": 5.0, "date": "2024-01-01"},
            {"date": "2024-02-01", "rate": null, "Region": "North"}
        ]"#;
        let table = read_json(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns, vec!["rate", "date", "Region"]);
        assert!(table.records[1].get("rate").is_missing());
        assert!(table.records[0].get("Region").is_missing());
    }

    #[test]
    fn parquet_narrow_ints_are_numbers_and_float_nan_is_missing() {
        use arrow::array::{ArrayRef, Int16Array, UInt8Array};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new("year", DataType::Int16, false),
            Field::new("month", DataType::UInt8, false),
            Field::new("rate", DataType::Float32, false),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int16Array::from(vec![2024, 2024])),
            Arc::new(UInt8Array::from(vec![1, 2])),
            Arc::new(Float32Array::from(vec![5.5, f32::NAN])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let sink = file.as_file().try_clone().unwrap();
        let mut writer = ArrowWriter::try_new(sink, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(file.path()).unwrap();
        assert_eq!(table.columns, vec!["year", "month", "rate"]);
        assert_eq!(table.records[0].get("year"), &CellValue::Number(2024.0));
        assert_eq!(table.records[1].get("month"), &CellValue::Number(2.0));
        assert_eq!(table.records[0].get("rate"), &CellValue::Number(5.5));
        assert!(table.records[1].get("rate").is_missing());
    }

    #[test]
    fn json_must_be_an_array() {
        assert!(read_json(r#"{"date": "2024-01-01"}"#).is_err());
    }

    #[test]
    fn load_file_dispatches_on_extension() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "date,rate").unwrap();
        writeln!(file, "2024-01-01,4.2").unwrap();
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.len(), 1);

        let other = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        assert!(load_file(other.path()).is_err());
    }
}
