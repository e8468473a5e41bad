//! CSV backend with a JSON sidecar for the series attributes.
//!
//! Every column is first read as text. Cells matching a missing-value token
//! become nulls, then each column is cast to its target type: the declared
//! type if the caller gave one, else the type recorded in the sidecar at
//! write time, else the narrowest type every remaining cell parses as
//! (Int64, Float64, Timestamp, Boolean, falling back to Utf8). Cells that
//! still do not parse become nulls and are reported with a warning.

use std::fs::File;
use std::io::{BufReader, BufWriter, Seek};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, RecordBatch, StringArray};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::error::ArrowError;
use arrow_csv::reader::Format as CsvFormat;
use arrow_csv::{ReaderBuilder, WriterBuilder};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use super::{
    ArrowSnafu, ColumnTypeCountSnafu, IoSnafu, JsonSnafu, PersistError, SeriesMetadata,
    sidecar_path,
};
use crate::series::TimeSeries;

/// Options for reading a CSV time series.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvReadOptions {
    /// Cell values (after trimming) that mean "missing". Empty cells are
    /// always missing.
    pub missing_tokens: Vec<String>,
    /// One type per header column, overriding stored and inferred types.
    pub column_types: Option<Vec<DataType>>,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            missing_tokens: vec!["NA".to_string(), "NaN".to_string(), "null".to_string()],
            column_types: None,
        }
    }
}

impl CsvReadOptions {
    /// Replace the missing-value tokens.
    pub fn with_missing_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Declare the type of every column, in header order.
    pub fn with_column_types(mut self, types: Vec<DataType>) -> Self {
        self.column_types = Some(types);
        self
    }
}

/// Contents of `<file>.meta.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    #[serde(flatten)]
    series: SeriesMetadata,
    /// Arrow type of each column at write time, rendered with `Display`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    column_types: Vec<String>,
}

pub(super) fn write(path: &Path, ts: &TimeSeries) -> Result<(), PersistError> {
    let display = path.display().to_string();
    {
        let file = File::create(path).context(IoSnafu { path: &display })?;
        let mut writer = WriterBuilder::new().with_header(true).build(file);
        writer
            .write(ts.table())
            .context(ArrowSnafu { path: &display })?;
    }

    let sidecar = Sidecar {
        series: SeriesMetadata::describe(ts),
        column_types: ts
            .table()
            .schema()
            .fields()
            .iter()
            .map(|field| field.data_type().to_string())
            .collect(),
    };
    let meta_path = sidecar_path(path);
    let meta_display = meta_path.display().to_string();
    let file = File::create(&meta_path).context(IoSnafu {
        path: &meta_display,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), &sidecar).context(JsonSnafu {
        path: &meta_display,
    })?;
    Ok(())
}

pub(super) fn read(path: &Path, options: &CsvReadOptions) -> Result<TimeSeries, PersistError> {
    let display = path.display().to_string();
    let sidecar = read_sidecar(path)?;

    let text = read_as_text(path).context(ArrowSnafu { path: &display })?;
    let schema = text.schema();
    let width = schema.fields().len();

    let targets: Vec<Option<DataType>> = match &options.column_types {
        Some(declared) => {
            ensure!(
                declared.len() == width,
                ColumnTypeCountSnafu {
                    path: &display,
                    declared: declared.len(),
                    found: width,
                }
            );
            declared.iter().cloned().map(Some).collect()
        }
        None if sidecar.column_types.len() == width => sidecar
            .column_types
            .iter()
            .map(|name| name.parse::<DataType>().ok())
            .collect(),
        None => vec![None; width],
    };

    let mut fields = Vec::with_capacity(width);
    let mut arrays = Vec::with_capacity(width);
    for ((field, column), target) in schema.fields().iter().zip(text.columns()).zip(targets) {
        let cleaned = clear_missing(column.as_string::<i32>(), &options.missing_tokens);
        let target = target.unwrap_or_else(|| infer_type(&cleaned));
        let array = coerce(field.name(), &cleaned, &target).context(ArrowSnafu { path: &display })?;
        fields.push(Field::new(field.name(), target, true));
        arrays.push(array);
    }
    let table = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .context(ArrowSnafu { path: &display })?;

    sidecar.series.assemble(path, table)
}

fn read_sidecar(path: &Path) -> Result<Sidecar, PersistError> {
    let meta_path = sidecar_path(path);
    let meta_display = meta_path.display().to_string();
    let file = File::open(&meta_path).context(IoSnafu {
        path: &meta_display,
    })?;
    serde_json::from_reader(BufReader::new(file)).context(JsonSnafu {
        path: &meta_display,
    })
}

/// Load the whole file with every column typed as Utf8.
fn read_as_text(path: &Path) -> Result<RecordBatch, ArrowError> {
    let mut file = File::open(path)?;
    let format = CsvFormat::default().with_header(true);
    let (inferred, _) = format.infer_schema(&mut file, Some(1))?;
    file.rewind()?;

    let schema = Arc::new(Schema::new(
        inferred
            .fields()
            .iter()
            .map(|field| Field::new(field.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .build(file)?;
    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    concat_batches(&schema, &batches)
}

fn clear_missing(column: &StringArray, tokens: &[String]) -> StringArray {
    column
        .iter()
        .map(|cell| {
            cell.filter(|value| {
                let value = value.trim();
                !value.is_empty() && !tokens.iter().any(|token| token == value)
            })
        })
        .collect()
}

/// Narrowest type that every non-null cell of `column` parses as.
fn infer_type(column: &StringArray) -> DataType {
    if column.null_count() == column.len() {
        return DataType::Float64;
    }
    let candidates = [
        DataType::Int64,
        DataType::Float64,
        DataType::Timestamp(TimeUnit::Nanosecond, None),
        DataType::Boolean,
    ];
    candidates
        .into_iter()
        .find(|candidate| {
            cast(column, candidate).is_ok_and(|out| out.null_count() == column.null_count())
        })
        .unwrap_or(DataType::Utf8)
}

fn coerce(name: &str, column: &StringArray, target: &DataType) -> Result<ArrayRef, ArrowError> {
    let out = cast(column, target)?;
    let lost = out.null_count().saturating_sub(column.null_count());
    if lost > 0 {
        warn!("column {name}: {lost} values could not be read as {target} and were set to null");
    } else {
        debug!("column {name} read as {target}");
    }
    Ok(out)
}
