//! Table layer.
//!
//! The table handle used throughout the crate is an Arrow [`RecordBatch`]. This
//! module holds the small amount of glue the rest of the crate needs on top of
//! it: building a batch from named columns, classifying column types, and
//! answering "is this cell missing?" uniformly for nulls and float NaNs.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, RecordBatch, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float32Type, Float64Type, Schema};
use arrow::error::ArrowError;
use snafu::prelude::*;

/// Errors raised while assembling a table from literal columns.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TableError {
    /// No columns were supplied at all.
    ///
    /// This is distinct from a table whose columns have zero rows, which is
    /// valid input.
    #[snafu(display("Cannot build a table from an empty column list"))]
    EmptyInput,

    /// Columns have different lengths, duplicate names, or similar shape issues.
    #[snafu(display("Invalid table columns: {source}"))]
    InvalidColumns {
        /// Underlying Arrow error.
        source: ArrowError,
    },
}

/// Build a table from `(name, array)` pairs, in the given order.
///
/// Every field is declared nullable so that later transformations can
/// introduce missing values without rewriting the schema.
pub fn table_from_columns<N: Into<String>>(
    columns: Vec<(N, ArrayRef)>,
) -> Result<RecordBatch, TableError> {
    ensure!(!columns.is_empty(), EmptyInputSnafu);

    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = columns
        .into_iter()
        .map(|(name, array)| (Field::new(name, array.data_type().clone(), true), array))
        .unzip();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context(InvalidColumnsSnafu)
}

/// Assemble a batch from `fields` and `arrays`.
pub(crate) fn rebuild(fields: Vec<Field>, arrays: Vec<ArrayRef>) -> Result<RecordBatch, ArrowError> {
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
}

/// Numeric kinds eligible for scaling.
pub fn is_numeric(datatype: &DataType) -> bool {
    matches!(
        datatype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Per-row "missing" flags for a column: null cells, and NaN for float kinds.
pub fn missing_mask(array: &dyn Array) -> Vec<bool> {
    match array.data_type() {
        DataType::Float64 => array
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.is_none_or(f64::is_nan))
            .collect(),
        DataType::Float32 => array
            .as_primitive::<Float32Type>()
            .iter()
            .map(|v| v.is_none_or(f32::is_nan))
            .collect(),
        _ => (0..array.len()).map(|i| array.is_null(i)).collect(),
    }
}

/// Cast a numeric column to `f64` values.
pub fn to_f64(array: &dyn Array) -> Result<Float64Array, ArrowError> {
    let out = cast(array, &DataType::Float64)?;
    Ok(out.as_primitive::<Float64Type>().clone())
}

/// Render every cell of a column as an optional string.
pub fn to_strings(array: &dyn Array) -> Result<StringArray, ArrowError> {
    let out = cast(array, &DataType::Utf8)?;
    Ok(out.as_string::<i32>().clone())
}
