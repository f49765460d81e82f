use std::collections::BTreeSet;

use anyhow::{Context, Result};

use crate::color::ColorMap;
use crate::data::export::to_csv_bytes;
use crate::data::filter::DateRange;
use crate::data::model::{CellValue, Table};
use crate::data::pipeline::{run, PipelineOutput, PipelineParams};
use crate::data::stats::RollingWindow;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full dashboard state, independent of rendering.
///
/// The raw table is never mutated; every parameter change reruns the whole
/// pipeline from it.
#[derive(Default)]
pub struct AppState {
    /// Loaded raw table (None until user loads a file).
    pub table: Option<Table>,

    /// Display name of the loaded file.
    pub source_name: Option<String>,

    /// Column selection and analysis parameters (None until a table is loaded).
    pub params: Option<PipelineParams>,

    /// Result of the last successful pipeline run.
    pub output: Option<PipelineOutput>,

    /// Distinct values of the selected region column in the raw table.
    pub region_values: BTreeSet<CellValue>,

    /// Colours for the region values.
    pub color_map: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

const DATE_HINTS: &[&str] = &["date", "time", "month", "period"];
const RATE_HINTS: &[&str] = &["unemploy", "rate", "%"];

fn find_hinted<'a>(columns: &'a [String], hints: &[&str], skip: Option<&str>) -> Option<&'a String> {
    columns.iter().filter(|c| Some(c.as_str()) != skip).find(|c| {
        let lower = c.to_lowercase();
        hints.iter().any(|h| lower.contains(h))
    })
}

/// Pick default date and rate columns from the header names, falling back
/// to the first column (and the second for the rate). `None` for a table
/// without columns.
pub fn guess_columns(table: &Table) -> Option<(String, String)> {
    let first = table.columns.first()?;
    let date = find_hinted(&table.columns, DATE_HINTS, None).unwrap_or(first);
    let rate = find_hinted(&table.columns, RATE_HINTS, Some(date.as_str()))
        .or_else(|| table.columns.iter().find(|c| *c != date))
        .unwrap_or(first);
    Some((date.clone(), rate.clone()))
}

impl AppState {
    /// Ingest a newly loaded table, pick default columns and run the pipeline.
    pub fn set_table(&mut self, table: Table, source_name: impl Into<String>) {
        self.params = guess_columns(&table).map(|(date, rate)| PipelineParams::new(date, rate));
        self.source_name = Some(source_name.into());
        self.table = Some(table);
        self.output = None;
        self.status_message = None;
        self.rebuild_regions();

        if self.params.is_none() {
            self.status_message = Some("The file has no columns.".to_string());
            return;
        }
        self.recompute();
    }

    /// Rerun the pipeline with the current parameters.
    pub fn recompute(&mut self) {
        let (Some(table), Some(params)) = (&self.table, &self.params) else {
            return;
        };
        match run(table, params) {
            Ok(output) => {
                log::debug!(
                    "recomputed: {} rows, {} missing-report entries",
                    output.table.len(),
                    output.missing.entries.len()
                );
                self.output = Some(output);
                self.status_message = None;
            }
            Err(e) => {
                log::warn!("pipeline rejected parameters: {e}");
                self.output = None;
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Rebuild the region value index and colour map from `region_column`.
    fn rebuild_regions(&mut self) {
        let region_col = self.params.as_ref().and_then(|p| p.region_column.clone());
        match (&self.table, region_col) {
            (Some(table), Some(col)) => {
                self.region_values = table.unique_values(&col);
                self.color_map = Some(ColorMap::new(&self.region_values));
            }
            _ => {
                self.region_values.clear();
                self.color_map = None;
            }
        }
    }

    fn update_params(&mut self, f: impl FnOnce(&mut PipelineParams)) {
        if let Some(params) = &mut self.params {
            f(params);
            self.recompute();
        }
    }

    /// Change the date column; the date range resets to the new full span.
    pub fn set_date_column(&mut self, column: String) {
        self.update_params(|p| {
            p.date_column = column;
            p.date_range = None;
        });
    }

    pub fn set_rate_column(&mut self, column: String) {
        self.update_params(|p| p.rate_column = column);
    }

    /// Change (or clear) the region column; all regions become selected.
    pub fn set_region_column(&mut self, column: Option<String>) {
        if let Some(params) = &mut self.params {
            params.region_column = column;
            params.regions = None;
        }
        self.rebuild_regions();
        self.recompute();
    }

    pub fn set_date_range(&mut self, range: DateRange) {
        self.update_params(|p| p.date_range = Some(range));
    }

    /// Back to the full parsed span.
    pub fn reset_date_range(&mut self) {
        self.update_params(|p| p.date_range = None);
    }

    pub fn set_window(&mut self, size: usize) {
        match RollingWindow::new(size) {
            Ok(window) => self.update_params(|p| p.window = window),
            Err(e) => self.status_message = Some(format!("Error: {e}")),
        }
    }

    pub fn set_want_correlation(&mut self, want: bool) {
        self.update_params(|p| p.want_correlation = want);
    }

    /// Whether a region value currently passes the region filter.
    pub fn is_region_selected(&self, value: &CellValue) -> bool {
        match self.params.as_ref().map(|p| &p.regions) {
            Some(Some(selected)) => selected.contains(value),
            _ => true,
        }
    }

    /// Toggle a single region value in the filter.
    pub fn toggle_region(&mut self, value: &CellValue) {
        let all = self.region_values.clone();
        self.update_params(|p| {
            let selected = p.regions.get_or_insert(all);
            if !selected.remove(value) {
                selected.insert(value.clone());
            }
        });
    }

    /// Select all region values (no constraint).
    pub fn select_all_regions(&mut self) {
        self.update_params(|p| p.regions = None);
    }

    /// Deselect all region values.
    pub fn select_no_regions(&mut self) {
        self.update_params(|p| p.regions = Some(BTreeSet::new()));
    }

    /// The cleaned table as CSV bytes, ready to save.
    pub fn export_csv(&self) -> Result<Vec<u8>> {
        let output = self
            .output
            .as_ref()
            .context("nothing to export: no analysis has run")?;
        to_csv_bytes(&output.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_csv;

    fn loaded(text: &str) -> AppState {
        let mut state = AppState::default();
        state.set_table(read_csv(text.as_bytes()).unwrap(), "test.csv");
        state
    }

    const REGIONAL: &str = "Region,Date,Estimated Unemployment Rate (%)\n\
                            North,2024-01-01,5.0\n\
                            South,2024-01-01,7.0\n\
                            North,2024-02-01,4.0\n";

    #[test]
    fn guesses_columns_from_names() {
        let state = loaded(REGIONAL);
        let params = state.params.as_ref().unwrap();
        assert_eq!(params.date_column, "Date");
        assert_eq!(params.rate_column, "Estimated Unemployment Rate (%)");
        assert_eq!(params.region_column, None);
        assert_eq!(state.output.as_ref().unwrap().table.len(), 3);
    }

    #[test]
    fn guess_falls_back_to_position() {
        let table = read_csv("a,b\n1,2\n".as_bytes()).unwrap();
        assert_eq!(guess_columns(&table), Some(("a".into(), "b".into())));
        assert_eq!(guess_columns(&Table::default()), None);
    }

    #[test]
    fn bad_column_choice_surfaces_as_status() {
        let mut state = loaded(REGIONAL);
        state.set_rate_column("nope".into());
        assert!(state.output.is_none());
        assert!(state.status_message.as_deref().unwrap().contains("nope"));

        state.set_rate_column("Estimated Unemployment Rate (%)".into());
        assert!(state.output.is_some());
        assert!(state.status_message.is_none());
    }

    #[test]
    fn region_toggles_rerun_the_pipeline() {
        let mut state = loaded(REGIONAL);
        state.set_region_column(Some("Region".into()));
        assert_eq!(state.region_values.len(), 2);
        assert!(state.color_map.is_some());

        let south = CellValue::Text("South".into());
        state.toggle_region(&south);
        assert!(!state.is_region_selected(&south));
        assert_eq!(state.output.as_ref().unwrap().table.len(), 2);

        state.select_no_regions();
        assert!(state.output.as_ref().unwrap().table.is_empty());

        state.select_all_regions();
        assert_eq!(state.output.as_ref().unwrap().table.len(), 3);
    }

    #[test]
    fn window_out_of_range_is_rejected() {
        let mut state = loaded(REGIONAL);
        state.set_window(13);
        assert!(state.status_message.is_some());
        assert_eq!(state.params.as_ref().unwrap().window, RollingWindow::default());
    }

    #[test]
    fn export_requires_a_run() {
        assert!(AppState::default().export_csv().is_err());
        let bytes = loaded(REGIONAL).export_csv().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("Region,Date,Estimated Unemployment Rate (%),RollingAvg\n"));
    }
}
