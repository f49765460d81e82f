//! The cleaning and aggregation pipeline.
//!
//! Every invocation is a pure function of the raw table and the caller's
//! [`PipelineParams`]; nothing is cached between runs.

use serde::{Deserialize, Serialize};

use super::dates::parse_cell;
use super::error::{ColumnRole, PipelineError};
use super::filter::{filter_by_date_range, filter_by_regions, DateRange, RegionSelection};
use super::model::{CellValue, Table};
use super::stats::{
    compute_correlation, compute_missing_report, compute_rolling_average, compute_summary,
    CorrelationMatrix, MissingReport, RollingWindow, SummaryStats,
};

/// Name of the column appended with the trailing mean of the rate column.
pub const ROLLING_AVG_COLUMN: &str = "RollingAvg";

// ---------------------------------------------------------------------------
// Parameters and results
// ---------------------------------------------------------------------------

/// Everything the caller chooses. Passed in full on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub date_column: String,
    pub rate_column: String,
    pub region_column: Option<String>,
    /// `None` keeps the full parsed span.
    pub date_range: Option<DateRange>,
    /// Only consulted when `region_column` is set.
    pub regions: RegionSelection,
    pub window: RollingWindow,
    pub want_correlation: bool,
}

impl PipelineParams {
    pub fn new(date_column: impl Into<String>, rate_column: impl Into<String>) -> Self {
        PipelineParams {
            date_column: date_column.into(),
            rate_column: rate_column.into(),
            region_column: None,
            date_range: None,
            regions: None,
            window: RollingWindow::default(),
            want_correlation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Parsed, sorted, filtered table with the `RollingAvg` column appended.
    pub table: Table,
    pub summary: SummaryStats,
    pub missing: MissingReport,
    pub correlation: Option<CorrelationMatrix>,
    /// Min/max of the parsed dates before range filtering. `None` when no
    /// row had a usable date.
    pub span: Option<DateRange>,
    /// Rows evicted because their date did not parse.
    pub dropped_rows: usize,
}

// ---------------------------------------------------------------------------
// Pipeline steps
// ---------------------------------------------------------------------------

/// Parse the date column, drop rows whose date failed, stable-sort ascending.
pub fn parse_dates(mut table: Table, date_column: &str) -> Table {
    table.records = table
        .records
        .into_iter()
        .filter_map(|mut record| {
            let parsed = parse_cell(record.get(date_column))?;
            record.set(date_column, CellValue::Date(parsed));
            Some(record)
        })
        .collect();
    table.records.sort_by_key(|r| r.get(date_column).as_date());
    table
}

/// Coerce the rate column to numbers. Unparsable cells become `Missing`;
/// no row is ever removed.
pub fn coerce_numeric(mut table: Table, rate_column: &str) -> Table {
    for record in &mut table.records {
        let coerced = match record.get(rate_column) {
            CellValue::Number(v) => CellValue::Number(*v),
            CellValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(v) if !v.is_nan() => CellValue::Number(v),
                _ => CellValue::Missing,
            },
            CellValue::Date(_) | CellValue::Missing => CellValue::Missing,
        };
        record.set(rate_column, coerced);
    }
    table
}

fn require_column(table: &Table, role: ColumnRole, column: &str) -> Result<(), PipelineError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(PipelineError::MissingColumn {
            role,
            column: column.to_string(),
        })
    }
}

/// Check the column selection against the table before any work is done.
pub fn validate(table: &Table, params: &PipelineParams) -> Result<(), PipelineError> {
    require_column(table, ColumnRole::Date, &params.date_column)?;
    require_column(table, ColumnRole::Rate, &params.rate_column)?;
    if let Some(region) = &params.region_column {
        require_column(table, ColumnRole::Region, region)?;
    }
    Ok(())
}

/// Run the whole pipeline over a raw table.
///
/// Order: parse dates → coerce rate → date-range filter → region filter →
/// missing report and correlation → append rolling average → summary.
pub fn run(raw: &Table, params: &PipelineParams) -> Result<PipelineOutput, PipelineError> {
    validate(raw, params)?;

    let date_col = params.date_column.as_str();
    let rate_col = params.rate_column.as_str();

    let mut table = parse_dates(raw.clone(), date_col);
    let dropped_rows = raw.len() - table.len();
    if dropped_rows > 0 {
        log::debug!("dropped {dropped_rows} rows with unparsable '{date_col}'");
    }

    table = coerce_numeric(table, rate_col);

    let span = DateRange::spanning(&table, date_col);
    if let Some(span) = &span {
        let range = params.date_range.unwrap_or(*span);
        table = filter_by_date_range(table, date_col, &range);
    }

    if let Some(region_col) = &params.region_column {
        table = filter_by_regions(table, region_col, &params.regions);
    }

    let missing = compute_missing_report(&table);
    let correlation = if params.want_correlation {
        compute_correlation(&table)
    } else {
        None
    };

    let rolling = compute_rolling_average(&table, rate_col, params.window);
    table.put_column(
        ROLLING_AVG_COLUMN,
        rolling
            .into_iter()
            .map(|v| v.map_or(CellValue::Missing, CellValue::Number))
            .collect(),
    );

    let summary = compute_summary(&table, rate_col);

    log::debug!(
        "pipeline: {} of {} rows retained, {} rate values",
        table.len(),
        raw.len(),
        summary.count
    );

    Ok(PipelineOutput {
        table,
        summary,
        missing,
        correlation,
        span,
        dropped_rows,
    })
}
