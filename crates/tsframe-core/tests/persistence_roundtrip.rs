#![allow(missing_docs)]

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, TimestampMillisecondArray};
use tempfile::TempDir;
use tsframe_core::formats::sidecar_path;
use tsframe_core::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn sample() -> Result<TimeSeries, Box<dyn std::error::Error>> {
    let table = table_from_columns(vec![
        (
            "timestamp",
            Arc::new(TimestampMillisecondArray::from(vec![0_i64, 60_000, 120_000])) as ArrayRef,
        ),
        (
            "load",
            Arc::new(Float64Array::from(vec![Some(0.5), None, Some(2.5)])) as ArrayRef,
        ),
        (
            "count",
            Arc::new(Int64Array::from(vec![10_i64, 20, 40])) as ArrayRef,
        ),
    ])?;
    Ok(TimeSeries::from_table(table, Format::Wide, 3)?)
}

fn round_trip(file: &str, ts: &TimeSeries) -> Result<TimeSeries, Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let path = tmp.path().join(file);
    WriteStrategy::for_path(&path)?.write(&path, ts)?;
    Ok(ReadStrategy::for_path(&path)?.read(&path)?)
}

#[test]
fn parquet_and_csv_restore_table_and_attributes() -> TestResult {
    let original = sample()?;
    for file in ["series.parquet", "series.csv"] {
        let back = round_trip(file, &original)?;
        assert_eq!(back.format(), Format::Wide, "{file}");
        assert_eq!(back.feature_count(), 3, "{file}");
        assert_eq!(back.table().schema(), original.table().schema(), "{file}");
        assert_eq!(back.table().columns(), original.table().columns(), "{file}");
        assert!(back.scale_state().is_none(), "{file}");
    }
    Ok(())
}

#[test]
fn long_layout_survives_both_backends() -> TestResult {
    let long = sample()?.to_long(false)?;
    for file in ["long.parquet", "long.csv"] {
        let back = round_trip(file, &long)?;
        assert_eq!(back.format(), Format::Long, "{file}");
        assert_eq!(back.len(), 6, "{file}");
        assert_eq!(back.signal_count(), 2, "{file}");
    }
    Ok(())
}

#[test]
fn scale_state_is_persisted_and_invertible_after_read() -> TestResult {
    let mut ts = sample()?;
    ts.normalize(&mut RobustScaler::new(), Some(vec!["count".to_string()]), true)?;
    let state = ts.scale_state().cloned().ok_or("no scale state")?;

    for file in ["scaled.parquet", "scaled.csv"] {
        let mut back = round_trip(file, &ts)?;
        assert_eq!(back.scale_state(), Some(&state), "{file}");

        back.denormalize(true)?;
        let restored = back
            .table()
            .column_by_name("count")
            .ok_or("missing column")?;
        let restored = restored
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or("count is not Float64")?;
        let got: Vec<f64> = restored.iter().flatten().collect();
        assert_eq!(got.len(), 3);
        for (g, want) in got.iter().zip([10.0, 20.0, 40.0]) {
            assert!((g - want).abs() < 1e-9, "{file}: {g} vs {want}");
        }
    }
    Ok(())
}

#[test]
fn csv_write_creates_sidecar() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("series.csv");
    WriteStrategy::Csv.write(&path, &sample()?)?;

    let sidecar = sidecar_path(&path);
    assert!(sidecar.ends_with("series.csv.meta.json"));
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&sidecar)?)?;
    assert_eq!(json["format"], "wide");
    assert_eq!(json["features"], "3");
    Ok(())
}

#[test]
fn unknown_extension_is_rejected() {
    let err = ReadStrategy::for_path(std::path::Path::new("series.xlsx")).unwrap_err();
    assert!(matches!(err, PersistError::UnsupportedExtension { .. }));
    let err = WriteStrategy::for_path(std::path::Path::new("series")).unwrap_err();
    assert!(matches!(err, PersistError::UnsupportedExtension { .. }));
}
