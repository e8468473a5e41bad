//! Wide <-> long conversion.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, RecordBatch, StringArray, UInt64Array, new_empty_array};
use arrow::compute::{SortColumn, cast, concat, lexsort_to_indices, take};
use arrow::datatypes::{DataType, Field, FieldRef};
use log::debug;
use snafu::prelude::*;

use super::error::{
    ArrowSnafu, DuplicateColumnSnafu, DuplicateLongEntrySnafu, IncompatibleValueTypesSnafu,
    LongShapeSnafu, NullSignalIdSnafu, WrongFormatSnafu,
};
use super::{Format, SIGNAL_ID_COLUMN, SeriesResult, TimeSeries, VALUE_COLUMN};
use crate::common::time_column::{display_timestamp, timestamp_ticks};
use crate::table::{is_numeric, rebuild, to_strings};

impl TimeSeries {
    /// Melt a wide series into `(timestamp, signal_id, value)` rows.
    ///
    /// Rows are sorted by timestamp, then by signal id. Signal columns of
    /// one type keep it; numeric columns of different types are widened to
    /// `Float64`. Mixing numeric and non-numeric signals is an error.
    ///
    /// The scale state is carried along but names wide columns, so it can
    /// only be undone after converting back with [`TimeSeries::to_wide`].
    pub fn to_long(&mut self, inplace: bool) -> SeriesResult<TimeSeries> {
        ensure!(
            self.format == Format::Wide,
            WrongFormatSnafu {
                operation: "to_long",
                expected: Format::Wide,
                actual: self.format,
            }
        );

        let table = melt(&self.table)?;
        debug!(
            "to_long: {} wide rows -> {} long rows",
            self.table.num_rows(),
            table.num_rows()
        );
        let next = TimeSeries {
            format: Format::Long,
            feature_count: self.feature_count,
            table,
            scale_state: self.scale_state.clone(),
        };
        Ok(self.commit(inplace, next))
    }

    /// Pivot a long series back to one column per signal id.
    ///
    /// Rows are ordered by timestamp and signal columns by id. Pairs absent
    /// from the long table become nulls. A repeated `(timestamp, signal_id)`
    /// pair or a null signal id is an error.
    pub fn to_wide(&mut self, inplace: bool) -> SeriesResult<TimeSeries> {
        ensure!(
            self.format == Format::Long,
            WrongFormatSnafu {
                operation: "to_wide",
                expected: Format::Long,
                actual: self.format,
            }
        );
        ensure!(
            self.table.num_columns() == 3,
            LongShapeSnafu {
                columns: self.table.num_columns()
            }
        );

        let table = pivot(&self.table)?;
        debug!(
            "to_wide: {} long rows -> {} wide rows x {} signals",
            self.table.num_rows(),
            table.num_rows(),
            table.num_columns() - 1
        );
        let next = TimeSeries {
            format: Format::Wide,
            feature_count: self.feature_count,
            table,
            scale_state: self.scale_state.clone(),
        };
        Ok(self.commit(inplace, next))
    }
}

/// Type shared by every melted value.
fn value_type(signals: &[&FieldRef]) -> SeriesResult<DataType> {
    let Some(first) = signals.first() else {
        return Ok(DataType::Float64);
    };
    let first_type = first.data_type();
    if signals.iter().all(|field| field.data_type() == first_type) {
        return Ok(first_type.clone());
    }
    for field in signals {
        ensure!(
            is_numeric(field.data_type()),
            IncompatibleValueTypesSnafu {
                column: field.name(),
                datatype: field.data_type().to_string(),
                expected: "numeric signal columns",
            }
        );
    }
    Ok(DataType::Float64)
}

fn melt(table: &RecordBatch) -> SeriesResult<RecordBatch> {
    let schema = table.schema();
    let ts_field = schema.field(0);
    let signals: Vec<&FieldRef> = schema.fields().iter().skip(1).collect();
    let value_type = value_type(&signals)?;
    let rows = table.num_rows();

    let repeated: Vec<u64> = signals
        .iter()
        .flat_map(|_| 0..rows as u64)
        .collect();
    let ts = take(table.column(0).as_ref(), &UInt64Array::from(repeated), None)
        .context(ArrowSnafu)?;

    let names: Vec<&str> = signals
        .iter()
        .flat_map(|field| std::iter::repeat_n(field.name().as_str(), rows))
        .collect();
    let ids: ArrayRef = Arc::new(StringArray::from(names));

    let values = (1..table.num_columns())
        .map(|index| cast(table.column(index).as_ref(), &value_type))
        .collect::<Result<Vec<_>, _>>()
        .context(ArrowSnafu)?;
    let values = if values.is_empty() {
        new_empty_array(&value_type)
    } else {
        let parts: Vec<&dyn Array> = values.iter().map(|a| a.as_ref()).collect();
        concat(&parts).context(ArrowSnafu)?
    };

    let order = lexsort_to_indices(
        &[
            SortColumn {
                values: ts.clone(),
                options: None,
            },
            SortColumn {
                values: ids.clone(),
                options: None,
            },
        ],
        None,
    )
    .context(ArrowSnafu)?;

    let arrays = [ts, ids, values]
        .iter()
        .map(|array| take(array.as_ref(), &order, None))
        .collect::<Result<Vec<_>, _>>()
        .context(ArrowSnafu)?;
    let fields = vec![
        Field::new(ts_field.name(), ts_field.data_type().clone(), true),
        Field::new(SIGNAL_ID_COLUMN, DataType::Utf8, false),
        Field::new(VALUE_COLUMN, value_type, true),
    ];
    rebuild(fields, arrays).context(ArrowSnafu)
}

fn pivot(table: &RecordBatch) -> SeriesResult<RecordBatch> {
    let schema = table.schema();
    let ts_field = schema.field(0);
    let ts = table.column(0);
    let values = table.column(2);
    let ticks = timestamp_ticks(ts.as_ref()).context(ArrowSnafu)?;
    let ids = to_strings(table.column(1).as_ref()).context(ArrowSnafu)?;

    // tick -> first row carrying it, ordered by tick
    let mut rows: BTreeMap<Option<i64>, u64> = BTreeMap::new();
    let mut cells: HashMap<(Option<i64>, &str), u64> = HashMap::new();
    let mut signals: BTreeSet<&str> = BTreeSet::new();

    for row in 0..table.num_rows() {
        ensure!(ids.is_valid(row), NullSignalIdSnafu { row });
        let id = ids.value(row);
        let tick = ticks.is_valid(row).then(|| ticks.value(row));
        rows.entry(tick).or_insert(row as u64);
        signals.insert(id);
        if cells.insert((tick, id), row as u64).is_some() {
            return DuplicateLongEntrySnafu {
                timestamp: display_timestamp(ts.as_ref(), row),
                signal: id,
            }
            .fail();
        }
    }

    let mut fields = vec![Field::new(
        ts_field.name(),
        ts_field.data_type().clone(),
        true,
    )];
    let first_rows = UInt64Array::from_iter_values(rows.values().copied());
    let mut arrays = vec![take(ts.as_ref(), &first_rows, None).context(ArrowSnafu)?];

    for id in signals {
        ensure!(id != ts_field.name().as_str(), DuplicateColumnSnafu { column: id });
        let indices: UInt64Array = rows
            .keys()
            .map(|tick| cells.get(&(*tick, id)).copied())
            .collect();
        arrays.push(take(values.as_ref(), &indices, None).context(ArrowSnafu)?);
        fields.push(Field::new(id, values.data_type().clone(), true));
    }

    rebuild(fields, arrays).context(ArrowSnafu)
}
