//! Rendering helpers for stdout.

use arrow::array::RecordBatch;
use arrow::error::ArrowError;
use arrow::util::pretty::pretty_format_batches;
use tsframe_core::prelude::{GapReport, GapRun, TimeSeries};
use tsframe_core::gaps::runs_to_batch;

/// Pretty-print at most `max_rows` rows of `table`.
pub fn preview(table: &RecordBatch, max_rows: usize) -> Result<String, ArrowError> {
    let head = table.slice(0, max_rows.min(table.num_rows()));
    Ok(pretty_format_batches(&[head])?.to_string())
}

/// Header lines printed by `inspect`.
pub fn describe(ts: &TimeSeries) -> String {
    let cardinality = if ts.is_univariate() {
        "univariate"
    } else if ts.is_multivariate() {
        "multivariate"
    } else {
        "no signals"
    };
    let scale = match ts.scale_state() {
        Some(state) => format!(
            "{} ({}) on [{}]",
            state.scaler,
            state.params.family(),
            state.columns.join(", ")
        ),
        None => "none".to_string(),
    };
    format!(
        "format: {}\nfeatures: {}\nrows: {}\nsignals: {} ({cardinality})\nscale state: {scale}",
        ts.format(),
        ts.feature_count(),
        ts.len(),
        ts.signal_count()
    )
}

/// Runs of one column as a table.
pub fn runs(runs: &[GapRun]) -> Result<String, ArrowError> {
    let table = runs_to_batch(runs)?;
    Ok(pretty_format_batches(&[table])?.to_string())
}

/// One section per analyzed column.
pub fn report(column: &str, index: usize, report: &GapReport) -> Result<String, ArrowError> {
    let body = match report {
        GapReport::Runs(found) => {
            let missing: usize = found
                .iter()
                .filter(|run| run.is_missing)
                .map(|run| run.run_length)
                .sum();
            format!("{missing} missing rows\n{}", runs(found)?)
        }
        GapReport::UnsupportedLeadingGap => {
            "unsupported: the column starts with a missing value".to_string()
        }
    };
    Ok(format!("column {column} (#{index}): {body}"))
}
