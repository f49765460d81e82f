use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDateTime};
use eframe::egui::{Color32, Ui};
use egui_plot::{GridMark, Legend, Line, Plot, PlotPoints, PlotUi, Points};

use rusty_rates::data::pipeline::{PipelineOutput, PipelineParams};
use rusty_rates::data::series::{rolling_series, trend_series, Series};
use rusty_rates::state::AppState;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Plot x coordinate: days since the Unix epoch.
fn x_of(t: NaiveDateTime) -> f64 {
    t.and_utc().timestamp() as f64 / SECONDS_PER_DAY
}

fn format_day(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    let secs = (mark.value * SECONDS_PER_DAY).round() as i64;
    DateTime::from_timestamp(secs, 0)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Draw a series as one line per run of present values; isolated values
/// become markers so they stay visible.
fn draw_series(plot_ui: &mut PlotUi, series: &Series, color: Color32) {
    for run in series.segments() {
        let points: PlotPoints = run.iter().map(|(t, v)| [x_of(*t), *v]).collect();
        if run.len() == 1 {
            plot_ui.points(Points::new(points).name(&series.label).color(color).radius(2.5));
        } else {
            plot_ui.line(Line::new(points).name(&series.label).color(color).width(1.5));
        }
    }
}

/// Date-axis plot shared by both charts.
fn show_time_plot(ui: &mut Ui, id: &str, y_label: &str, add_contents: impl FnOnce(&mut PlotUi)) {
    Plot::new(id)
        .legend(Legend::default())
        .height(300.0)
        .x_axis_label("Date")
        .y_axis_label(y_label.to_string())
        .x_axis_formatter(format_day)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(false)
        .allow_zoom(true)
        .show(ui, add_contents);
}

// ---------------------------------------------------------------------------
// Rate over time, one line per region
// ---------------------------------------------------------------------------

pub fn trend_plot(ui: &mut Ui, state: &AppState, params: &PipelineParams, output: &PipelineOutput) {
    let series = trend_series(
        &output.table,
        &params.date_column,
        &params.rate_column,
        params.region_column.as_deref(),
    );

    show_time_plot(ui, "trend_plot", &params.rate_column, |plot_ui| {
        for s in &series {
            let color = s
                .key
                .as_ref()
                .zip(state.color_map.as_ref())
                .map(|(key, cm)| cm.color_for(key))
                .unwrap_or(Color32::LIGHT_BLUE);
            draw_series(plot_ui, s, color);
        }
    });
}

// ---------------------------------------------------------------------------
// Rate with rolling-average overlay
// ---------------------------------------------------------------------------

pub fn rolling_plot(ui: &mut Ui, params: &PipelineParams, output: &PipelineOutput) {
    let [rate, rolling] = rolling_series(&output.table, &params.date_column, &params.rate_column);

    show_time_plot(ui, "rolling_plot", &params.rate_column, |plot_ui| {
        draw_series(plot_ui, &rate, Color32::LIGHT_BLUE);
        draw_series(plot_ui, &rolling, Color32::from_rgb(255, 165, 0));
    });
}
