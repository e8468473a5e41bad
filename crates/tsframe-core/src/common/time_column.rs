//! Errors and helpers related to the timestamp axis in column 0.
//!
//! A time series is only meaningful when its first column carries a timestamp
//! type. This module provides:
//! - [`TimeColumnError`] for the common failure modes (no columns at all, or a
//!   first column with a non-timestamp Arrow type).
//! - [`ensure_timestamp_first`] to validate a schema.
//! - [`timestamp_ticks`] and [`coerce_to_timestamp`] so other modules can
//!   compare and align time axes without caring about the concrete unit.

use arrow::array::{Array, ArrayRef, AsArray, Int64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Int64Type, Schema};
use arrow::error::ArrowError;
use arrow::util::display::array_value_to_string;
use snafu::Snafu;

/// Errors that can occur when locating or validating the timestamp column.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum TimeColumnError {
    /// The table has no columns, so there is no time axis to validate.
    #[snafu(display("Table has no columns; expected a timestamp column at position 0"))]
    NoColumns,

    /// Column 0 exists but its Arrow type is not a timestamp.
    ///
    /// Plain integer indexes, dates and strings are all rejected here; callers
    /// that hold textual timestamps should cast them before construction.
    #[snafu(display(
        "The first column must be a timestamp: column {column} has type {datatype}, expected Timestamp(_, _)"
    ))]
    NotTimestamp {
        /// Name of the offending first column.
        column: String,
        /// The Arrow type found for it (e.g. "Int64", "Utf8").
        datatype: String,
    },
}

/// True for any Arrow timestamp type, regardless of unit or timezone.
pub fn is_timestamp(datatype: &DataType) -> bool {
    matches!(datatype, DataType::Timestamp(_, _))
}

/// Validate that `schema` has a timestamp type in column 0.
pub fn ensure_timestamp_first(schema: &Schema) -> Result<(), TimeColumnError> {
    let Some(field) = schema.fields().first() else {
        return NoColumnsSnafu.fail();
    };

    if !is_timestamp(field.data_type()) {
        return NotTimestampSnafu {
            column: field.name().clone(),
            datatype: field.data_type().to_string(),
        }
        .fail();
    }

    Ok(())
}

/// Reinterpret a timestamp column as raw `i64` ticks in its own unit.
///
/// Null timestamps stay null. Timezones do not affect the ticks because Arrow
/// stores timestamps as UTC offsets from the epoch.
pub fn timestamp_ticks(array: &dyn Array) -> Result<Int64Array, ArrowError> {
    let ticks = cast(array, &DataType::Int64)?;
    Ok(ticks.as_primitive::<Int64Type>().clone())
}

/// Cast `array` to the timestamp type `target` unless it already has it.
///
/// Handles unit changes between timestamp types and parsing of textual
/// timestamps (`2022-01-01T00:00:00` or `2022-01-01 00:00:00`).
pub fn coerce_to_timestamp(array: &ArrayRef, target: &DataType) -> Result<ArrayRef, ArrowError> {
    if array.data_type() == target {
        return Ok(array.clone());
    }
    cast(array.as_ref(), target)
}

/// Render a single timestamp cell for error messages and logs.
pub fn display_timestamp(array: &dyn Array, row: usize) -> String {
    array_value_to_string(array, row).unwrap_or_else(|_| format!("<row {row}>"))
}
