//! Error types and SNAFU context selectors for `series`.
//!
//! This module centralizes the `SeriesError` enum used by every `TimeSeries`
//! operation and exposes context selectors (via `#[snafu(visibility(pub(crate)))]`)
//! so sibling modules can attach context without re-exporting everything at
//! the crate root. [`ErrorKind`] groups the variants into the coarse
//! categories callers usually branch on.

use arrow::error::ArrowError;
use snafu::prelude::*;

use crate::{common::time_column::TimeColumnError, gaps::GapError, scaler::ScalerError};

use super::Format;

/// Coarse error categories.
///
/// None of these are transient: the fix is always to change the input or the
/// call sequence, never to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The table cannot back a time series (bad time axis, empty data, bad tag).
    Construction,
    /// Wrong format, cardinality, or column arguments for the operation.
    InvalidArgument,
    /// `normalize` resolved to zero columns.
    NoNumericColumns,
    /// `denormalize` met a scaler family without a closed-form inverse.
    UnsupportedScaler,
    /// `denormalize` was called before any `normalize`.
    MissingState,
    /// Gap analysis met a column whose first value is missing.
    UnsupportedLeadingGap,
    /// Failure surfaced from Arrow or a scaler.
    Backend,
}

/// Errors from time-series operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SeriesError {
    /// Column 0 is missing or is not a timestamp.
    #[snafu(display("Cannot construct time series: {source}"))]
    InvalidTimeColumn {
        /// Underlying time column error.
        source: TimeColumnError,
    },

    /// A format tag other than "wide" or "long".
    #[snafu(display("Unknown time series format {value:?}; expected \"wide\" or \"long\""))]
    UnknownFormat {
        /// The rejected tag.
        value: String,
    },

    /// The operation requires a different layout.
    #[snafu(display("{operation} requires a {expected} time series, got {actual}"))]
    WrongFormat {
        /// Name of the operation that was attempted.
        operation: &'static str,
        /// Layout the operation accepts.
        expected: Format,
        /// Layout the series actually has.
        actual: Format,
    },

    /// A long table must have exactly timestamp, signal id and value columns.
    #[snafu(display("A long time series must have 3 columns, found {columns}"))]
    LongShape {
        /// Number of columns found.
        columns: usize,
    },

    /// The long table repeats a `(timestamp, signal_id)` pair.
    #[snafu(display("Duplicate entry for timestamp {timestamp} and signal {signal}"))]
    DuplicateLongEntry {
        /// Rendered timestamp of the duplicated pair.
        timestamp: String,
        /// Signal id of the duplicated pair.
        signal: String,
    },

    /// The long table has a null signal id.
    #[snafu(display("Signal id is null at row {row}"))]
    NullSignalId {
        /// Row holding the null id.
        row: usize,
    },

    /// Wide signal columns cannot share one value column.
    #[snafu(display(
        "Column {column} has type {datatype}, which cannot share a value column with {expected}"
    ))]
    IncompatibleValueTypes {
        /// First column whose type does not fit.
        column: String,
        /// Its type.
        datatype: String,
        /// Type established by earlier columns.
        expected: String,
    },

    /// `join` was given no series.
    #[snafu(display("Cannot join an empty list of time series"))]
    EmptyJoin,

    /// A `join` member is not in wide format.
    #[snafu(display("Series {index} in join list is {actual}, expected wide"))]
    JoinMemberNotWide {
        /// Position of the member in the list.
        index: usize,
        /// Its format.
        actual: Format,
    },

    /// A `join` member does not have exactly one signal column.
    #[snafu(display("Series {index} in join list must be univariate (2 columns), found {columns}"))]
    JoinMemberNotUnivariate {
        /// Position of the member in the list.
        index: usize,
        /// Its column count.
        columns: usize,
    },

    /// A `join` member declares a feature count other than 2.
    #[snafu(display("Series {index} in join list must declare 2 features, found {feature_count}"))]
    JoinMemberFeatureCount {
        /// Position of the member in the list.
        index: usize,
        /// Its declared feature count.
        feature_count: usize,
    },

    /// Exact join found a member whose timestamps differ from the first series.
    #[snafu(display("Series {index} in join list does not share the first series' timestamps"))]
    JoinTimestampMismatch {
        /// Position of the member in the list.
        index: usize,
    },

    /// Two inputs would produce the same column name.
    #[snafu(display("Column {column} appears more than once"))]
    DuplicateColumn {
        /// The repeated name.
        column: String,
    },

    /// A named column does not exist.
    #[snafu(display("Column {column} not found in time series"))]
    ColumnNotFound {
        /// The requested name.
        column: String,
    },

    /// A column selected for a numeric operation is not numeric.
    #[snafu(display("Column {column} has non-numeric type {datatype}"))]
    NotNumeric {
        /// The selected column.
        column: String,
        /// Its type.
        datatype: String,
    },

    /// The timestamp column was selected for scaling.
    #[snafu(display("Timestamp column {column} cannot be normalized"))]
    TimestampSelected {
        /// Name of the timestamp column.
        column: String,
    },

    /// The operation needs exactly one signal column.
    #[snafu(display("{operation} requires a univariate time series; use split() first"))]
    NotUnivariate {
        /// Name of the operation that was attempted.
        operation: &'static str,
    },

    /// `normalize` found nothing to scale.
    #[snafu(display("No numeric columns to normalize"))]
    NoNumericColumns,

    /// `denormalize` met a scaler family without a closed-form inverse.
    #[snafu(display("Unsupported scaler for denormalization: {family}"))]
    UnsupportedScaler {
        /// Family reported by the stored parameters.
        family: String,
    },

    /// `denormalize` was called on a series that was never normalized.
    #[snafu(display("Time series has no scale state; normalize it first"))]
    MissingScaleState,

    /// The stored scale state names a column the table does not have.
    #[snafu(display("Scale state refers to column {column}, which is not in the table"))]
    ScaleStateMismatch {
        /// The missing column.
        column: String,
    },

    /// Gap analysis failed.
    #[snafu(display("Gap analysis failed: {source}"))]
    Gap {
        /// Underlying gap error.
        source: GapError,
    },

    /// The scaler could not be fitted.
    #[snafu(display("Scaler failed: {source}"))]
    Scaler {
        /// Underlying scaler error.
        source: ScalerError,
    },

    /// Arrow compute or conversion error.
    #[snafu(display("Arrow error: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },
}

impl SeriesError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SeriesError::InvalidTimeColumn { .. } | SeriesError::UnknownFormat { .. } => {
                ErrorKind::Construction
            }
            SeriesError::NoNumericColumns => ErrorKind::NoNumericColumns,
            SeriesError::UnsupportedScaler { .. } => ErrorKind::UnsupportedScaler,
            SeriesError::MissingScaleState => ErrorKind::MissingState,
            SeriesError::Gap {
                source: GapError::UnsupportedLeadingGap { .. },
            } => ErrorKind::UnsupportedLeadingGap,
            SeriesError::Scaler { .. } | SeriesError::Arrow { .. } => ErrorKind::Backend,
            _ => ErrorKind::InvalidArgument,
        }
    }
}

/// A convenience type alias for results of time-series operations.
pub type SeriesResult<T> = Result<T, SeriesError>;
