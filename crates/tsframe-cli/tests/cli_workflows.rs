//! End-to-end runs of the `tsframe` binary.

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;
use tsframe_core::prelude::{Format, ReadStrategy};

mod common;

use common::{TestResult, arg, write_gappy, write_weather};

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tsframe"))
}

#[test]
fn inspect_prints_attributes_and_preview() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_weather(&tmp, "weather.parquet")?;

    cli()
        .args(["inspect", "--input", &arg(&input)])
        .assert()
        .success()
        .stdout(contains("format: wide"))
        .stdout(contains("features: 3"))
        .stdout(contains("signals: 2 (multivariate)"))
        .stdout(contains("scale state: none"))
        .stdout(contains("velocidade"));
    Ok(())
}

#[test]
fn convert_to_long_and_back() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_weather(&tmp, "weather.parquet")?;
    let long = tmp.path().join("long.parquet");
    let wide = tmp.path().join("wide.csv");

    cli()
        .args(["convert", "--input", &arg(&input), "--output", &arg(&long), "--to", "long"])
        .assert()
        .success()
        .stdout(contains("Converted to long"));

    let stored = ReadStrategy::for_path(&long)?.read(&long)?;
    assert_eq!(stored.format(), Format::Long);
    assert_eq!(stored.len(), 8);
    assert_eq!(stored.feature_count(), 3);

    cli()
        .args(["convert", "--input", &arg(&long), "--output", &arg(&wide), "--to", "wide"])
        .assert()
        .success();

    let back = ReadStrategy::for_path(&wide)?.read(&wide)?;
    assert_eq!(back.format(), Format::Wide);
    assert_eq!(back.len(), 4);
    assert_eq!(back.column_count(), 3);
    Ok(())
}

#[test]
fn split_then_join_rebuilds_the_series() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_weather(&tmp, "weather.parquet")?;
    let parts = tmp.path().join("parts");

    cli()
        .args(["split", "--input", &arg(&input), "--output-dir", &arg(&parts)])
        .assert()
        .success()
        .stdout(contains("weather_temperatura.parquet"))
        .stdout(contains("weather_velocidade.parquet"));

    let temp = parts.join("weather_temperatura.parquet");
    let speed = parts.join("weather_velocidade.parquet");
    let joined = tmp.path().join("joined.parquet");
    cli()
        .args([
            "join",
            "--input",
            &arg(&temp),
            "--input",
            &arg(&speed),
            "--output",
            &arg(&joined),
            "--mode",
            "exact",
        ])
        .assert()
        .success()
        .stdout(contains("Joined 2 series (exact): 4 rows, 3 features"));

    let back = ReadStrategy::for_path(&joined)?.read(&joined)?;
    assert_eq!(back.table().schema().field(1).name(), "temperatura");
    assert_eq!(back.table().schema().field(2).name(), "velocidade");
    Ok(())
}

#[test]
fn join_rejects_multivariate_member() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_weather(&tmp, "weather.parquet")?;
    let out = tmp.path().join("out.parquet");

    cli()
        .args(["join", "--input", &arg(&input), "--output", &arg(&out)])
        .assert()
        .failure()
        .stderr(contains("univariate"));
    assert!(!out.exists());
    Ok(())
}

#[test]
fn gaps_reports_missing_runs() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_gappy(&tmp, "gappy.parquet")?;

    cli()
        .args(["gaps", "--input", &arg(&input)])
        .assert()
        .success()
        .stdout(contains("column value (#1): 2 missing rows"));

    cli()
        .args(["gaps", "--input", &arg(&input), "--column", "value"])
        .assert()
        .success()
        .stdout(contains("run_length"));

    cli()
        .args(["gaps", "--input", &arg(&input), "--column", "nope"])
        .assert()
        .failure()
        .stderr(contains("nope"));
    Ok(())
}

#[test]
fn gap_mask_adds_overlay_column() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_gappy(&tmp, "gappy.parquet")?;
    let out = tmp.path().join("masked.parquet");

    cli()
        .args(["gap-mask", "--input", &arg(&input), "--output", &arg(&out)])
        .assert()
        .success();

    let back = ReadStrategy::for_path(&out)?.read(&out)?;
    assert_eq!(back.column_count(), 3);
    assert_eq!(back.feature_count(), 3);
    assert!(back.table().column_by_name("value_nan").is_some());
    Ok(())
}

#[test]
fn normalize_then_denormalize_restores_state() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_weather(&tmp, "weather.parquet")?;
    let scaled = tmp.path().join("scaled.parquet");
    let restored = tmp.path().join("restored.parquet");

    cli()
        .args([
            "normalize",
            "--input",
            &arg(&input),
            "--output",
            &arg(&scaled),
            "--scaler",
            "robust",
            "--column",
            "velocidade",
        ])
        .assert()
        .success()
        .stdout(contains("Normalized with RobustScaler"));

    cli()
        .args(["inspect", "--input", &arg(&scaled)])
        .assert()
        .success()
        .stdout(contains("scale state: RobustScaler (robust) on [velocidade]"));

    cli()
        .args(["denormalize", "--input", &arg(&scaled), "--output", &arg(&restored)])
        .assert()
        .success();

    let back = ReadStrategy::for_path(&restored)?.read(&restored)?;
    assert!(back.scale_state().is_none());

    cli()
        .args(["denormalize", "--input", &arg(&restored), "--output", &arg(&scaled)])
        .assert()
        .failure()
        .stderr(contains("no scale state"));
    Ok(())
}

#[test]
fn standard_scaling_cannot_be_undone() -> TestResult {
    let tmp = TempDir::new()?;
    let input = write_weather(&tmp, "weather.parquet")?;
    let scaled = tmp.path().join("scaled.csv");
    let restored = tmp.path().join("restored.csv");

    cli()
        .args([
            "normalize",
            "--input",
            &arg(&input),
            "--output",
            &arg(&scaled),
            "--scaler",
            "standard",
        ])
        .assert()
        .success();

    cli()
        .args(["denormalize", "--input", &arg(&scaled), "--output", &arg(&restored)])
        .assert()
        .failure()
        .stderr(contains("Unsupported scaler"));
    Ok(())
}

#[test]
fn unreadable_input_exits_non_zero() -> TestResult {
    let tmp = TempDir::new()?;
    let missing = tmp.path().join("missing.parquet");
    let unknown = tmp.path().join("data.xlsx");
    std::fs::write(&unknown, b"not a table")?;

    cli()
        .args(["inspect", "--input", &arg(&missing)])
        .assert()
        .failure()
        .stderr(contains("missing.parquet"));

    cli()
        .args(["inspect", "--input", &arg(&unknown)])
        .assert()
        .failure();
    Ok(())
}
