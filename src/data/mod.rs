/// Data layer: core types, loading, cleaning, aggregation and export.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (Number | Text | Missing cells)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐   parse dates → coerce rate → date range → regions
///   │ pipeline  │   → missing report / correlation → RollingAvg → summary
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │  series   │   │  export   │  chart lines / CSV bytes
///   └──────────┘   └──────────┘
/// ```

pub mod dates;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod series;
pub mod stats;
