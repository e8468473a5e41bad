#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float32Array, Float64Array, Int32Array, TimestampMillisecondArray};
use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use tsframe_core::prelude::{Format, TimeSeries, WriteStrategy, table_from_columns};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

fn hourly(rows: usize) -> ArrayRef {
    let base = Utc
        .with_ymd_and_hms(2022, 1, 1, 0, 0, 0)
        .single()
        .map(|t| t.timestamp_millis())
        .unwrap_or_default();
    Arc::new(TimestampMillisecondArray::from(
        (0..rows as i64)
            .map(|h| base + h * 3_600_000)
            .collect::<Vec<_>>(),
    ))
}

fn save(path: &Path, columns: Vec<(&str, ArrayRef)>) -> Result<(), Box<dyn std::error::Error>> {
    let features = columns.len();
    let table = table_from_columns(columns)?;
    let ts = TimeSeries::from_table(table, Format::Wide, features)?;
    WriteStrategy::for_path(path)?.write(path, &ts)?;
    Ok(())
}

/// Wide file with temperature and speed over four hours.
pub fn write_weather(dir: &TempDir, file: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = dir.path().join(file);
    save(
        &path,
        vec![
            ("timestamp", hourly(4)),
            (
                "temperatura",
                Arc::new(Float32Array::from(vec![25.0, 26.0, 27.0, 23.2])) as ArrayRef,
            ),
            (
                "velocidade",
                Arc::new(Int32Array::from(vec![3000, 1100, 1200, 4000])) as ArrayRef,
            ),
        ],
    )?;
    Ok(path)
}

/// Univariate file whose rows 1 and 2 are missing.
pub fn write_gappy(dir: &TempDir, file: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = dir.path().join(file);
    save(
        &path,
        vec![
            ("timestamp", hourly(5)),
            (
                "value",
                Arc::new(Float64Array::from(vec![
                    Some(1.0),
                    None,
                    None,
                    Some(4.0),
                    Some(5.0),
                ])) as ArrayRef,
            ),
        ],
    )?;
    Ok(path)
}

pub fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
