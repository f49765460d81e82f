//! Rusty Rates: explore unemployment time series from an uploaded table.
//!
//! The [`data`] layer is UI-free and can be driven directly; the desktop
//! binary layers an egui dashboard over [`state::AppState`].

pub mod color;
pub mod data;
pub mod state;

pub use data::error::PipelineError;
pub use data::model::{CellValue, Record, Table};
pub use data::pipeline::{run, PipelineOutput, PipelineParams};
