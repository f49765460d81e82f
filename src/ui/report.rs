use eframe::egui::{self, Align2, FontId, Rect, RichText, ScrollArea, Sense, Ui, vec2};

use rusty_rates::color::{contrast_text, diverging_color};
use rusty_rates::data::model::Table;
use rusty_rates::data::stats::{CorrelationMatrix, MissingReport, SummaryStats};
use rusty_rates::state::AppState;

use super::plot;

const PREVIEW_ROWS: usize = 5;

/// Headline metric text: two decimals and a percent sign, or `N/A`.
pub fn format_rate(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}%"),
        None => "N/A".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render every dashboard section for the current state.
pub fn dashboard(ui: &mut Ui, state: &AppState) {
    let Some(table) = &state.table else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(
                "Open a CSV file containing at least a date and an unemployment rate column  (File → Open…)",
            );
        });
        return;
    };

    ui.heading("Data Preview");
    preview(ui, table);
    ui.add_space(12.0);

    let (Some(params), Some(output)) = (&state.params, &state.output) else {
        return;
    };

    if output.dropped_rows > 0 {
        ui.label(
            RichText::new(format!(
                "{} rows skipped: '{}' could not be parsed as a date",
                output.dropped_rows, params.date_column
            ))
            .weak(),
        );
    }

    ui.heading("Unemployment Rate Over Time");
    plot::trend_plot(ui, state, params, output);
    ui.add_space(12.0);

    ui.heading("Key Statistics");
    metrics(ui, &output.summary);
    ui.add_space(12.0);

    ui.heading("Missing Value Summary");
    missing_table(ui, &output.missing);
    ui.add_space(12.0);

    if params.want_correlation {
        ui.heading("Correlation Heatmap");
        match &output.correlation {
            Some(matrix) => heatmap(ui, matrix),
            None => {
                ui.label("No numeric columns to correlate.");
            }
        }
        ui.add_space(12.0);
    }

    ui.heading("Rolling Average");
    ui.label(format!("Window: {} rows", params.window.get()));
    plot::rolling_plot(ui, params, output);
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// First rows of the raw upload, before any cleaning.
fn preview(ui: &mut Ui, table: &Table) {
    ScrollArea::horizontal()
        .id_salt("preview_scroll")
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("preview")
                .striped(true)
                .show(ui, |ui: &mut Ui| {
                    for col in &table.columns {
                        ui.strong(col);
                    }
                    ui.end_row();
                    for record in table.records.iter().take(PREVIEW_ROWS) {
                        for col in &table.columns {
                            let cell = record.get(col);
                            if cell.is_missing() {
                                ui.label(RichText::new("—").weak());
                            } else {
                                ui.label(cell.to_string());
                            }
                        }
                        ui.end_row();
                    }
                });
        });
}

fn metrics(ui: &mut Ui, summary: &SummaryStats) {
    let entries = [
        ("Peak Unemployment", summary.peak),
        ("Average Rate", summary.mean),
        ("Lowest Rate", summary.lowest),
    ];
    ui.columns(entries.len(), |cols: &mut [Ui]| {
        for (col, (label, value)) in cols.iter_mut().zip(entries) {
            col.label(label);
            col.label(RichText::new(format_rate(value)).size(24.0).strong());
        }
    });
}

fn missing_table(ui: &mut Ui, report: &MissingReport) {
    if report.is_empty() {
        ui.label("No missing values.");
        return;
    }
    egui::Grid::new("missing_report")
        .striped(true)
        .num_columns(2)
        .show(ui, |ui: &mut Ui| {
            ui.strong("Column");
            ui.strong("Missing Values");
            ui.end_row();
            for entry in &report.entries {
                ui.label(&entry.column);
                ui.label(entry.count.to_string());
                ui.end_row();
            }
        });
}

fn short_name(name: &str) -> String {
    const MAX: usize = 14;
    if name.chars().count() <= MAX {
        name.to_string()
    } else {
        let head: String = name.chars().take(MAX - 1).collect();
        format!("{head}…")
    }
}

/// Annotated heatmap of the correlation matrix.
fn heatmap(ui: &mut Ui, matrix: &CorrelationMatrix) {
    let n = matrix.len();
    let cell = 56.0;
    let label_w = 120.0;
    let header_h = 22.0;
    let size = vec2(label_w + cell * n as f32, header_h + cell * n as f32);

    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    let origin = response.rect.min;
    let text_color = ui.visuals().text_color();
    let label_font = FontId::proportional(11.0);

    for (j, name) in matrix.columns.iter().enumerate() {
        painter.text(
            origin + vec2(label_w + cell * (j as f32 + 0.5), header_h * 0.5),
            Align2::CENTER_CENTER,
            short_name(name),
            label_font.clone(),
            text_color,
        );
    }

    for (i, name) in matrix.columns.iter().enumerate() {
        let row_y = header_h + cell * i as f32;
        painter.text(
            origin + vec2(label_w - 6.0, row_y + cell * 0.5),
            Align2::RIGHT_CENTER,
            short_name(name),
            label_font.clone(),
            text_color,
        );
        for j in 0..n {
            let value = matrix.get(i, j);
            let rect = Rect::from_min_size(
                origin + vec2(label_w + cell * j as f32, row_y),
                vec2(cell, cell),
            )
            .shrink(1.0);
            painter.rect_filled(rect, 2.0, diverging_color(value));
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                value.map_or_else(|| "–".to_string(), |v| format!("{v:.2}")),
                FontId::proportional(12.0),
                contrast_text(value),
            );
        }
    }
}
