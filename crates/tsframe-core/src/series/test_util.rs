use super::*;
use crate::table::table_from_columns;
use arrow::array::{
    ArrayRef, AsArray, Float32Array, Float64Array, Int32Array, TimestampMillisecondArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use chrono::{TimeZone, Utc};

pub(crate) type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Milliseconds since the epoch for 2022-01-01 at `hour`:00 UTC.
pub(crate) fn hour_millis(hour: i64) -> i64 {
    let base = Utc
        .with_ymd_and_hms(2022, 1, 1, 0, 0, 0)
        .single()
        .expect("valid base timestamp");
    base.timestamp_millis() + hour * 3_600_000
}

/// Millisecond timestamp column with one entry per hour offset.
pub(crate) fn timestamps(hours: &[i64]) -> ArrayRef {
    Arc::new(TimestampMillisecondArray::from(
        hours.iter().map(|h| hour_millis(*h)).collect::<Vec<_>>(),
    ))
}

/// Wide series with a `timestamp` column plus the given signals.
pub(crate) fn wide(hours: &[i64], signals: Vec<(&str, ArrayRef)>) -> SeriesResult<TimeSeries> {
    let mut columns = vec![("timestamp", timestamps(hours))];
    columns.extend(signals);
    let feature_count = columns.len();
    let table = table_from_columns(columns).expect("valid test table");
    TimeSeries::from_table(table, Format::Wide, feature_count)
}

/// Univariate wide series over `0..values.len()` hours.
pub(crate) fn univariate(name: &str, values: Vec<Option<f64>>) -> SeriesResult<TimeSeries> {
    let hours: Vec<i64> = (0..values.len() as i64).collect();
    wide(&hours, vec![(name, Arc::new(Float64Array::from(values)) as ArrayRef)])
}

/// Four hourly rows of temperature (Float32) and speed (Int32).
pub(crate) fn scenario_a() -> SeriesResult<TimeSeries> {
    wide(
        &[0, 1, 2, 3],
        vec![
            (
                "temperatura",
                Arc::new(Float32Array::from(vec![25.0, 26.0, 27.0, 23.2])) as ArrayRef,
            ),
            (
                "velocidade",
                Arc::new(Int32Array::from(vec![3000, 1100, 1200, 4000])) as ArrayRef,
            ),
        ],
    )
}

/// Column `name` of `ts` as optional `f64` values.
pub(crate) fn f64_column(ts: &TimeSeries, name: &str) -> Vec<Option<f64>> {
    let column = ts.table().column_by_name(name).expect("column exists");
    let values = cast(column.as_ref(), &DataType::Float64).expect("numeric column");
    values.as_primitive::<Float64Type>().iter().collect()
}

/// Raw millisecond ticks of column 0.
pub(crate) fn millis(ts: &TimeSeries) -> Vec<Option<i64>> {
    crate::common::time_column::timestamp_ticks(ts.table().column(0).as_ref())
        .expect("timestamp column")
        .iter()
        .collect()
}
