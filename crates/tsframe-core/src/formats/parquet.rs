//! Parquet backend: the series attributes ride in the file's key-value metadata.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::compute::concat_batches;
use arrow::datatypes::Schema;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;

use super::{ArrowSnafu, IoSnafu, JsonSnafu, ParquetSnafu, PersistError, SeriesMetadata};
use crate::series::TimeSeries;

pub(super) fn write(path: &Path, ts: &TimeSeries) -> Result<(), PersistError> {
    let display = path.display().to_string();
    let key_values = SeriesMetadata::describe(ts)
        .to_key_values()
        .context(JsonSnafu { path: &display })?
        .into_iter()
        .map(|(key, value)| KeyValue::new(key, value))
        .collect();
    let props = WriterProperties::builder()
        .set_key_value_metadata(Some(key_values))
        .build();

    let file = File::create(path).context(IoSnafu { path: &display })?;
    let mut writer = ArrowWriter::try_new(file, ts.table().schema(), Some(props))
        .context(ParquetSnafu { path: &display })?;
    writer
        .write(ts.table())
        .context(ParquetSnafu { path: &display })?;
    writer.close().context(ParquetSnafu { path: &display })?;
    Ok(())
}

pub(super) fn read(path: &Path) -> Result<TimeSeries, PersistError> {
    let display = path.display().to_string();
    let file = File::open(path).context(IoSnafu { path: &display })?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context(ParquetSnafu { path: &display })?;

    let pairs: Vec<(String, String)> = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|kv| kv.value.clone().map(|value| (kv.key.clone(), value)))
                .collect()
        })
        .unwrap_or_default();
    let metadata = SeriesMetadata::from_key_values(pairs).context(JsonSnafu { path: &display })?;

    // Drop schema-level metadata so it does not leak into later writes.
    let schema = Arc::new(Schema::new(builder.schema().fields().clone()));
    let reader = builder.build().context(ParquetSnafu { path: &display })?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context(ArrowSnafu { path: &display })?;
    let table = concat_batches(&schema, &batches).context(ArrowSnafu { path: &display })?;
    let table = RecordBatch::try_new(schema, table.columns().to_vec())
        .context(ArrowSnafu { path: &display })?;

    metadata.assemble(path, table)
}
