use std::path::Path;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use rusty_rates::data::filter::DateRange;
use rusty_rates::data::stats::RollingWindow;
use rusty_rates::state::AppState;

/// Default file name offered when exporting the filtered table.
pub const EXPORT_FILE_NAME: &str = "filtered_unemployment_data.csv";

// ---------------------------------------------------------------------------
// Left side panel – column selection and analysis parameters
// ---------------------------------------------------------------------------

/// Combo box over column names. Returns the newly picked column, if any.
fn column_combo(ui: &mut Ui, id: &str, current: &str, columns: &[String]) -> Option<String> {
    let mut picked = None;
    egui::ComboBox::from_id_salt(id)
        .selected_text(current)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            for col in columns {
                if ui.selectable_label(current == col, col).clicked() && current != col {
                    picked = Some(col.clone());
                }
            }
        });
    picked
}

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Analysis");
    ui.separator();

    let (Some(table), Some(params)) = (&state.table, &state.params) else {
        ui.label("No dataset loaded.");
        return;
    };

    // Clone what we need so we can mutate state below.
    let columns = table.columns.clone();
    let params = params.clone();
    let span = state.output.as_ref().and_then(|o| o.span);

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Column selection ----
            ui.strong("Date column");
            if let Some(col) = column_combo(ui, "date_column", &params.date_column, &columns) {
                state.set_date_column(col);
            }
            ui.strong("Unemployment rate column");
            if let Some(col) = column_combo(ui, "rate_column", &params.rate_column, &columns) {
                state.set_rate_column(col);
            }

            ui.strong("Region / state column (optional)");
            let current_region = params.region_column.clone();
            let mut picked_region = None;
            egui::ComboBox::from_id_salt("region_column")
                .selected_text(current_region.as_deref().unwrap_or("None"))
                .width(ui.available_width())
                .show_ui(ui, |ui: &mut Ui| {
                    if ui.selectable_label(current_region.is_none(), "None").clicked() {
                        picked_region = Some(None);
                    }
                    for col in &columns {
                        let selected = current_region.as_deref() == Some(col.as_str());
                        if ui.selectable_label(selected, col).clicked() {
                            picked_region = Some(Some(col.clone()));
                        }
                    }
                });
            if let Some(region) = picked_region.filter(|r| *r != current_region) {
                state.set_region_column(region);
            }
            ui.separator();

            // ---- Date range ----
            ui.strong("Date range");
            match span {
                Some(span) => {
                    let current = params.date_range.unwrap_or(span);
                    let mut start = current.start().date();
                    let mut end = current.end().date();
                    let mut changed = false;
                    egui::Grid::new("date_range").num_columns(2).show(ui, |ui: &mut Ui| {
                        ui.label("From");
                        changed |= ui
                            .add(DatePickerButton::new(&mut start).id_salt("range_start"))
                            .changed();
                        ui.end_row();
                        ui.label("To");
                        changed |= ui
                            .add(DatePickerButton::new(&mut end).id_salt("range_end"))
                            .changed();
                        ui.end_row();
                    });
                    if changed {
                        if let Some(range) = DateRange::from_days(start, end) {
                            state.set_date_range(range);
                        }
                    }
                    if params.date_range.is_some() && ui.small_button("Full range").clicked() {
                        state.reset_date_range();
                    }
                }
                None => {
                    ui.label("No parsable dates in the selected column.");
                }
            }
            ui.separator();

            // ---- Region filter ----
            if params.region_column.is_some() {
                region_filter(ui, state);
                ui.separator();
            }

            // ---- Rolling average / correlation ----
            ui.strong("Rolling average window (months)");
            let mut window = params.window.get();
            if ui
                .add(egui::Slider::new(&mut window, RollingWindow::MIN..=RollingWindow::MAX))
                .changed()
            {
                state.set_window(window);
            }

            let mut want = params.want_correlation;
            if ui.checkbox(&mut want, "Show correlation heatmap").changed() {
                state.set_want_correlation(want);
            }
            ui.separator();

            if ui.button("Export filtered CSV…").clicked() {
                save_file_dialog(state);
            }
        });
}

/// Checkbox per region value, coloured like its chart line.
fn region_filter(ui: &mut Ui, state: &mut AppState) {
    let values = state.region_values.clone();
    let n_selected = values.iter().filter(|v| state.is_region_selected(v)).count();

    egui::CollapsingHeader::new(
        RichText::new(format!("Regions  ({n_selected}/{})", values.len())).strong(),
    )
    .id_salt("region_filter")
    .default_open(true)
    .show(ui, |ui: &mut Ui| {
        // Select all / none buttons
        ui.horizontal(|ui: &mut Ui| {
            if ui.small_button("All").clicked() {
                state.select_all_regions();
            }
            if ui.small_button("None").clicked() {
                state.select_no_regions();
            }
        });

        for val in &values {
            let mut text = RichText::new(val.to_string());
            if let Some(cm) = &state.color_map {
                text = text.color(cm.color_for(val));
            }
            let mut checked = state.is_region_selected(val);
            if ui.checkbox(&mut checked, text).changed() {
                state.toggle_region(val);
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = state.output.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export filtered CSV…"))
                .clicked()
            {
                save_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(name), Some(table)) = (&state.source_name, &state.table) {
            let retained = state.output.as_ref().map_or(0, |o| o.table.len());
            ui.label(format!(
                "{name}: {} rows loaded, {retained} after cleaning and filtering",
                table.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

/// Load a table from disk into the state, reporting failures in the status line.
pub fn load_path(state: &mut AppState, path: &Path) {
    match rusty_rates::data::loader::load_file(path) {
        Ok(table) => {
            log::info!(
                "Loaded {} rows with columns {:?} from {}",
                table.len(),
                table.columns,
                path.display()
            );
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            state.set_table(table, name);
        }
        Err(e) => {
            log::error!("Failed to load file: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open unemployment data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        load_path(state, &path);
    }
}

pub fn save_file_dialog(state: &mut AppState) {
    let bytes = match state.export_csv() {
        Ok(bytes) => bytes,
        Err(e) => {
            state.status_message = Some(format!("Error: {e:#}"));
            return;
        }
    };

    let file = rfd::FileDialog::new()
        .set_title("Export filtered data")
        .set_file_name(EXPORT_FILE_NAME)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        match std::fs::write(&path, bytes) {
            Ok(()) => log::info!("Exported filtered data to {}", path.display()),
            Err(e) => {
                log::error!("Failed to export: {e}");
                state.status_message = Some(format!("Error: could not write {}: {e}", path.display()));
            }
        }
    }
}
