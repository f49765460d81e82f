use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Headline metrics
// ---------------------------------------------------------------------------

/// Peak / mean / lowest rate over the non-missing values.
///
/// Every metric is `None` ("unavailable") when no rate value survived
/// coercion and filtering; a real zero is `Some(0.0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub peak: Option<f64>,
    pub mean: Option<f64>,
    pub lowest: Option<f64>,
    /// Number of non-missing values the metrics were computed from.
    pub count: usize,
}

impl SummaryStats {
    pub fn is_available(&self) -> bool {
        self.count > 0
    }
}

pub fn compute_summary(table: &Table, rate_column: &str) -> SummaryStats {
    let values: Vec<f64> = table.column(rate_column).filter_map(CellValue::as_f64).collect();
    if values.is_empty() {
        return SummaryStats::default();
    }
    let peak = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lowest = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    SummaryStats {
        peak: Some(peak),
        mean: Some(mean),
        lowest: Some(lowest),
        count: values.len(),
    }
}

// ---------------------------------------------------------------------------
// Missing-value report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub count: usize,
}

/// Per-column missing counts, in table column order, zero counts omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissingReport {
    pub entries: Vec<MissingCount>,
}

impl MissingReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Missing count for a column; `0` for columns not in the report.
    pub fn count(&self, column: &str) -> usize {
        self.entries
            .iter()
            .find(|e| e.column == column)
            .map_or(0, |e| e.count)
    }
}

pub fn compute_missing_report(table: &Table) -> MissingReport {
    let entries = table
        .columns
        .iter()
        .map(|col| MissingCount {
            column: col.clone(),
            count: table.column(col).filter(|c| c.is_missing()).count(),
        })
        .filter(|e| e.count > 0)
        .collect();
    MissingReport { entries }
}

// ---------------------------------------------------------------------------
// Correlation matrix
// ---------------------------------------------------------------------------

/// Square, symmetric Pearson correlation matrix over the numeric columns.
///
/// `values[i][j]` is `None` when the coefficient is undefined for that pair
/// (fewer than two rows where both are present, or a constant column).
/// The diagonal is always `Some(1.0)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row)?.get(col).copied().flatten()
    }
}

/// Columns whose non-missing cells are all numbers, with at least one number.
pub fn numeric_columns(table: &Table) -> Vec<String> {
    table
        .columns
        .iter()
        .filter(|col| {
            let mut any_number = false;
            for cell in table.column(col) {
                match cell {
                    CellValue::Number(_) => any_number = true,
                    CellValue::Missing => {}
                    CellValue::Text(_) | CellValue::Date(_) => return false,
                }
            }
            any_number
        })
        .cloned()
        .collect()
}

pub fn compute_correlation(table: &Table) -> Option<CorrelationMatrix> {
    let columns = numeric_columns(table);
    if columns.is_empty() {
        return None;
    }

    let series: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|col| table.column(col).map(CellValue::as_f64).collect())
        .collect();

    let n = columns.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        values[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let r = pearson(&series[i], &series[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Some(CorrelationMatrix { columns, values })
}

/// Pearson coefficient over the rows where both sides are present.
///
/// A side counts as constant when its spread is negligible next to the
/// magnitude of its values, so rounding noise in a flat column does not
/// produce a coefficient while small-scale data still does.
fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    let (mut sq_x, mut sq_y) = (0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
        sq_x += x * x;
        sq_y += y * y;
    }
    if var_x <= f64::EPSILON * sq_x || var_y <= f64::EPSILON * sq_y {
        return None;
    }
    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

// ---------------------------------------------------------------------------
// Rolling average
// ---------------------------------------------------------------------------

/// Trailing window length for the rolling mean, `1..=12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct RollingWindow(usize);

impl RollingWindow {
    pub const MIN: usize = 1;
    pub const MAX: usize = 12;

    pub fn new(size: usize) -> Result<Self, PipelineError> {
        if (Self::MIN..=Self::MAX).contains(&size) {
            Ok(RollingWindow(size))
        } else {
            Err(PipelineError::InvalidWindow {
                got: size,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        RollingWindow(3)
    }
}

impl TryFrom<usize> for RollingWindow {
    type Error = PipelineError;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        RollingWindow::new(size)
    }
}

impl From<RollingWindow> for usize {
    fn from(window: RollingWindow) -> usize {
        window.0
    }
}

/// Trailing mean over `window` rows ending at each index.
///
/// The first `window - 1` entries are `None`, and so is any window that
/// contains a missing value. No partial-window averaging.
pub fn rolling_mean(values: &[Option<f64>], window: RollingWindow) -> Vec<Option<f64>> {
    let w = window.get();
    (0..values.len())
        .map(|i| {
            if i + 1 < w {
                return None;
            }
            let slice = &values[i + 1 - w..=i];
            let sum = slice.iter().try_fold(0.0, |acc, v| v.map(|v| acc + v))?;
            Some(sum / w as f64)
        })
        .collect()
}

pub fn compute_rolling_average(table: &Table, rate_column: &str, window: RollingWindow) -> Vec<Option<f64>> {
    let rates: Vec<Option<f64>> = table.column(rate_column).map(CellValue::as_f64).collect();
    rolling_mean(&rates, window)
}
