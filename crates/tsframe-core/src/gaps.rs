//! Run-length analysis of missing values.
//!
//! A column is partitioned into maximal runs of rows that share the same
//! missing/present status. Each run is reported as a [`GapRun`] in row order,
//! so for any column whose first value is present:
//!
//! - `is_missing` alternates strictly, starting with `false`;
//! - the run lengths sum to the row count;
//! - each run starts where the previous one ended, the first at row 0.
//!
//! A column that *starts* with a missing value is rejected with
//! [`GapError::UnsupportedLeadingGap`]: the encoding's first entry always
//! describes a present run.
//!
//! "Missing" means an Arrow null, or NaN in a floating-point column.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, RecordBatch, UInt64Array};
use arrow::error::ArrowError;
use log::debug;
use snafu::prelude::*;

use crate::table::{is_numeric, missing_mask};

/// Errors raised by gap analysis.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum GapError {
    /// The first value of the column is missing.
    #[snafu(display(
        "Column {column} starts with a missing value; leading gaps are not supported"
    ))]
    UnsupportedLeadingGap {
        /// Name of the analyzed column.
        column: String,
    },

    /// The requested column is not present in the table.
    #[snafu(display("Column {column} not found in table"))]
    ColumnNotFound {
        /// Name that was requested.
        column: String,
    },
}

/// One maximal run of equal missing/present status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapRun {
    /// Whether the rows in this run are missing.
    pub is_missing: bool,
    /// Number of rows in the run.
    pub run_length: usize,
    /// Zero-based row offset of the run's first row.
    pub start_index: usize,
}

impl GapRun {
    /// Row offset just past the end of the run.
    pub fn end_index(&self) -> usize {
        self.start_index + self.run_length
    }
}

/// Outcome of analyzing one column within [`analyze_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapReport {
    /// The run-length encoding of the column.
    Runs(Vec<GapRun>),
    /// The column starts with a missing value.
    UnsupportedLeadingGap,
}

/// Per-column gap reports for a whole table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapSummary {
    /// Reports keyed by `(column index, column name)`.
    pub columns: BTreeMap<(usize, String), GapReport>,
    /// Index of the last column that was analyzed, if any.
    pub last_index: Option<usize>,
}

/// Run-length encode a sequence of missing flags.
pub fn encode_runs(column: &str, missing: &[bool]) -> Result<Vec<GapRun>, GapError> {
    let Some(&first) = missing.first() else {
        return Ok(Vec::new());
    };
    ensure!(
        !first,
        UnsupportedLeadingGapSnafu {
            column: column.to_string()
        }
    );

    let mut runs = Vec::new();
    let mut current = GapRun {
        is_missing: first,
        run_length: 0,
        start_index: 0,
    };
    for (row, &flag) in missing.iter().enumerate() {
        if flag != current.is_missing {
            runs.push(current);
            current = GapRun {
                is_missing: flag,
                run_length: 0,
                start_index: row,
            };
        }
        current.run_length += 1;
    }
    runs.push(current);

    Ok(runs)
}

/// Analyze one named column of `table`.
pub fn analyze_column(table: &RecordBatch, column: &str) -> Result<Vec<GapRun>, GapError> {
    let array = table
        .column_by_name(column)
        .context(ColumnNotFoundSnafu { column })?;
    let runs = encode_runs(column, &missing_mask(array.as_ref()))?;
    debug!(
        "gap analysis of {column}: {} runs, {} missing rows",
        runs.len(),
        runs.iter()
            .filter(|r| r.is_missing)
            .map(|r| r.run_length)
            .sum::<usize>()
    );
    Ok(runs)
}

/// Analyze every numeric column of `table`.
///
/// Columns that start with a missing value are reported as
/// [`GapReport::UnsupportedLeadingGap`] instead of failing the whole call.
pub fn analyze_all(table: &RecordBatch) -> GapSummary {
    let mut summary = GapSummary::default();
    for (index, field) in table.schema().fields().iter().enumerate() {
        if !is_numeric(field.data_type()) {
            continue;
        }
        let missing = missing_mask(table.column(index).as_ref());
        let report = match encode_runs(field.name(), &missing) {
            Ok(runs) => GapReport::Runs(runs),
            Err(_) => GapReport::UnsupportedLeadingGap,
        };
        summary
            .columns
            .insert((index, field.name().clone()), report);
        summary.last_index = Some(index);
    }
    summary
}

/// Render runs as a three-column table (`is_missing`, `run_length`, `start_index`).
pub fn runs_to_batch(runs: &[GapRun]) -> Result<RecordBatch, ArrowError> {
    let is_missing: ArrayRef = Arc::new(BooleanArray::from(
        runs.iter().map(|r| r.is_missing).collect::<Vec<_>>(),
    ));
    let run_length: ArrayRef = Arc::new(UInt64Array::from(
        runs.iter().map(|r| r.run_length as u64).collect::<Vec<_>>(),
    ));
    let start_index: ArrayRef = Arc::new(UInt64Array::from(
        runs.iter().map(|r| r.start_index as u64).collect::<Vec<_>>(),
    ));

    RecordBatch::try_from_iter(vec![
        ("is_missing", is_missing),
        ("run_length", run_length),
        ("start_index", start_index),
    ])
}
