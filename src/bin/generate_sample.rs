//! Writes a synthetic monthly unemployment dataset as
//! `sample_unemployment.csv` and `sample_unemployment.parquet`.
//!
//! The CSV deliberately carries a few defects (unparsable dates, text in the
//! rate column, NA markers) so the cleaning steps have something to do.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Months, NaiveDate};
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Row {
    date: String,
    region: String,
    rate: Option<f64>,
    rate_text: String,
    participation: f64,
}

/// Seasonal baseline plus a shock around month 27 (a recession spike).
fn unemployment_rate(base: f64, month: usize, rng: &mut SimpleRng) -> f64 {
    let seasonal = 0.4 * (2.0 * std::f64::consts::PI * month as f64 / 12.0).sin();
    let shock = if (27..33).contains(&month) {
        6.0 * (-((month as f64 - 29.0).powi(2)) / 4.0).exp()
    } else {
        0.0
    };
    (base + seasonal + shock + rng.gauss(0.0, 0.25)).max(0.0)
}

fn generate(rng: &mut SimpleRng) -> Result<Vec<Row>> {
    let regions = [("North", 4.2), ("South", 6.8), ("East", 5.1), ("West", 3.6)];
    let start = NaiveDate::from_ymd_opt(2019, 1, 1).context("invalid start date")?;
    let months = 60;

    let mut rows = Vec::new();
    for month in 0..months {
        let date = start
            .checked_add_months(Months::new(month as u32))
            .context("date overflow")?;
        for &(region, base) in &regions {
            let rate = unemployment_rate(base, month, rng);
            let rounded = (rate * 100.0).round() / 100.0;
            rows.push(Row {
                date: date.format("%Y-%m-%d").to_string(),
                region: region.to_string(),
                rate: Some(rounded),
                rate_text: format!("{rounded:.2}"),
                participation: ((62.0 - rate * 0.8 + rng.gauss(0.0, 0.5)) * 100.0).round() / 100.0,
            });
        }
    }

    // A handful of defects at fixed positions.
    if let Some(row) = rows.get_mut(17) {
        row.rate = None;
        row.rate_text = "TBD".to_string();
    }
    if let Some(row) = rows.get_mut(42) {
        row.rate = None;
        row.rate_text = "N/A".to_string();
    }
    if let Some(row) = rows.get_mut(99) {
        row.date = "not a date".to_string();
    }
    Ok(rows)
}

fn write_csv(rows: &[Row], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(["Date", "Region", "Unemployment Rate (%)", "Labour Participation Rate (%)"])?;
    for row in rows {
        let participation = row.participation.to_string();
        writer.write_record([
            row.date.as_str(),
            row.region.as_str(),
            row.rate_text.as_str(),
            participation.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &str) -> Result<()> {
    let date_array = StringArray::from(rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>());
    let region_array = StringArray::from(rows.iter().map(|r| r.region.as_str()).collect::<Vec<_>>());
    let rate_array = Float64Array::from(rows.iter().map(|r| r.rate).collect::<Vec<_>>());
    let participation_array =
        Float64Array::from(rows.iter().map(|r| r.participation).collect::<Vec<_>>());

    let schema = Arc::new(Schema::new(vec![
        Field::new("Date", DataType::Utf8, false),
        Field::new("Region", DataType::Utf8, false),
        Field::new("Unemployment Rate (%)", DataType::Float64, true),
        Field::new("Labour Participation Rate (%)", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(date_array),
            Arc::new(region_array),
            Arc::new(rate_array),
            Arc::new(participation_array),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng)?;

    let csv_path = "sample_unemployment.csv";
    let parquet_path = "sample_unemployment.parquet";
    write_csv(&rows, csv_path)?;
    write_parquet(&rows, parquet_path)?;

    println!("Wrote {} rows to {csv_path} and {parquet_path}", rows.len());
    Ok(())
}
