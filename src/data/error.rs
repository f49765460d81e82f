use std::fmt;

use thiserror::Error;

/// Which caller-selected column a usage error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Date,
    Rate,
    Region,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRole::Date => write!(f, "date"),
            ColumnRole::Rate => write!(f, "rate"),
            ColumnRole::Region => write!(f, "region"),
        }
    }
}

/// Usage errors raised before any computation starts. Malformed cells are
/// never errors; they become [`CellValue::Missing`](super::model::CellValue).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("{role} column '{column}' does not exist in the table")]
    MissingColumn { role: ColumnRole, column: String },

    #[error("rolling window must be between {min} and {max}, got {got}")]
    InvalidWindow { got: usize, min: usize, max: usize },
}
