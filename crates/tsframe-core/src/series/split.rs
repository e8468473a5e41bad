//! Splitting a multivariate wide series into univariate ones, and joining
//! univariate series back together on their timestamps.
//!
//! Joining aligns rows by raw timestamp ticks after coercing each member's
//! time column to the unit of the first member. Null timestamps never match.

use std::collections::HashMap;
use std::fmt;

use arrow::array::{Array, Int64Array, RecordBatch, UInt32Array};
use arrow::compute::{cast, take};
use arrow::datatypes::Field;
use log::{debug, warn};
use snafu::prelude::*;

use super::error::{
    ArrowSnafu, DuplicateColumnSnafu, EmptyJoinSnafu, JoinMemberFeatureCountSnafu,
    JoinMemberNotUnivariateSnafu, JoinMemberNotWideSnafu, JoinTimestampMismatchSnafu,
    WrongFormatSnafu,
};
use super::{Format, SeriesResult, TimeSeries};
use crate::common::time_column::{coerce_to_timestamp, timestamp_ticks};
use crate::table::rebuild;

/// How [`TimeSeries::join_with`] treats timestamps that are not shared by
/// every member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMode {
    /// Keep only timestamps present on both sides, in the first series' order.
    #[default]
    Inner,
    /// Keep every timestamp, sorted ascending; absent cells become nulls.
    Outer,
    /// Require identical timestamp sets and fail otherwise.
    Exact,
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinMode::Inner => "inner",
            JoinMode::Outer => "outer",
            JoinMode::Exact => "exact",
        })
    }
}

impl TimeSeries {
    /// One univariate wide series per signal column, in column order.
    ///
    /// Each result has the original timestamp column plus one signal and a
    /// feature count of 2. Long series must be converted with
    /// [`TimeSeries::to_wide`] first.
    pub fn split(&self) -> SeriesResult<Vec<TimeSeries>> {
        ensure!(
            self.format == Format::Wide,
            WrongFormatSnafu {
                operation: "split",
                expected: Format::Wide,
                actual: self.format,
            }
        );

        let parts = (1..self.table.num_columns())
            .map(|index| {
                let table = self.table.project(&[0, index]).context(ArrowSnafu)?;
                Ok(TimeSeries {
                    format: Format::Wide,
                    feature_count: 2,
                    table,
                    scale_state: None,
                })
            })
            .collect::<SeriesResult<Vec<_>>>()?;
        debug!("split into {} univariate series", parts.len());
        Ok(parts)
    }

    /// Inner-join univariate wide series on their timestamps.
    ///
    /// Same as [`TimeSeries::join_with`] with [`JoinMode::Inner`].
    pub fn join(series: &[TimeSeries]) -> SeriesResult<TimeSeries> {
        Self::join_with(series, JoinMode::Inner)
    }

    /// Join univariate wide series into one multivariate series.
    ///
    /// Every member must be wide, have exactly two columns and declare a
    /// feature count of 2. A single member is returned as is. The result's
    /// feature count is its column count.
    pub fn join_with(series: &[TimeSeries], mode: JoinMode) -> SeriesResult<TimeSeries> {
        ensure!(!series.is_empty(), EmptyJoinSnafu);
        for (index, member) in series.iter().enumerate() {
            check_member(index, member)?;
        }

        let (first, rest) = series.split_first().context(EmptyJoinSnafu)?;
        if rest.is_empty() {
            return Ok(first.clone());
        }

        let mut table = first.table.clone();
        for (offset, member) in rest.iter().enumerate() {
            table = merge(&table, &member.table, mode, offset + 1)?;
        }
        debug!(
            "{mode} join of {} series: {} rows, {} columns",
            series.len(),
            table.num_rows(),
            table.num_columns()
        );

        Ok(TimeSeries {
            format: Format::Wide,
            feature_count: table.num_columns(),
            table,
            scale_state: None,
        })
    }
}

fn check_member(index: usize, member: &TimeSeries) -> SeriesResult<()> {
    ensure!(
        member.format == Format::Wide,
        JoinMemberNotWideSnafu {
            index,
            actual: member.format,
        }
    );
    ensure!(
        member.table.num_columns() == 2,
        JoinMemberNotUnivariateSnafu {
            index,
            columns: member.table.num_columns(),
        }
    );
    ensure!(
        member.feature_count == 2,
        JoinMemberFeatureCountSnafu {
            index,
            feature_count: member.feature_count,
        }
    );
    Ok(())
}

/// Row pairing produced by [`align`].
#[derive(Debug, Default)]
struct Alignment {
    /// `(left row, right row, tick)` for every matching pair, in left order.
    matched: Vec<(u32, u32, i64)>,
    left_only: Vec<(u32, Option<i64>)>,
    right_only: Vec<(u32, Option<i64>)>,
}

fn align(left: &Int64Array, right: &Int64Array) -> Alignment {
    let mut by_tick: HashMap<i64, Vec<u32>> = HashMap::new();
    for row in 0..right.len() {
        if right.is_valid(row) {
            by_tick.entry(right.value(row)).or_default().push(row as u32);
        }
    }

    let mut alignment = Alignment::default();
    let mut right_matched = vec![false; right.len()];
    for row in 0..left.len() {
        let tick = left.is_valid(row).then(|| left.value(row));
        match tick.and_then(|t| by_tick.get(&t).map(|rows| (t, rows))) {
            Some((t, rows)) => {
                for &r in rows {
                    right_matched[r as usize] = true;
                    alignment.matched.push((row as u32, r, t));
                }
            }
            None => alignment.left_only.push((row as u32, tick)),
        }
    }
    for (row, matched) in right_matched.iter().enumerate() {
        if !matched {
            let tick = right.is_valid(row).then(|| right.value(row));
            alignment.right_only.push((row as u32, tick));
        }
    }
    alignment
}

/// Merge the univariate `right` into the accumulated `left` table.
fn merge(
    left: &RecordBatch,
    right: &RecordBatch,
    mode: JoinMode,
    index: usize,
) -> SeriesResult<RecordBatch> {
    let left_schema = left.schema();
    let right_schema = right.schema();
    let target = left_schema.field(0).data_type().clone();
    let signal = right_schema.field(1);
    ensure!(
        left_schema.column_with_name(signal.name()).is_none(),
        DuplicateColumnSnafu {
            column: signal.name(),
        }
    );

    let right_ts = coerce_to_timestamp(right.column(0), &target).context(ArrowSnafu)?;
    let left_ticks = timestamp_ticks(left.column(0).as_ref()).context(ArrowSnafu)?;
    let right_ticks = timestamp_ticks(right_ts.as_ref()).context(ArrowSnafu)?;
    let alignment = align(&left_ticks, &right_ticks);

    let mut rows: Vec<(Option<u32>, Option<u32>, Option<i64>)> = alignment
        .matched
        .iter()
        .map(|&(l, r, t)| (Some(l), Some(r), Some(t)))
        .collect();
    match mode {
        JoinMode::Inner => {
            let dropped = alignment.left_only.len() + alignment.right_only.len();
            if dropped > 0 {
                warn!(
                    "inner join with series {index} dropped {dropped} rows whose timestamps are not shared"
                );
            }
        }
        JoinMode::Exact => {
            ensure!(
                alignment.left_only.is_empty() && alignment.right_only.is_empty(),
                JoinTimestampMismatchSnafu { index }
            );
        }
        JoinMode::Outer => {
            rows.extend(
                alignment
                    .left_only
                    .iter()
                    .map(|&(l, t)| (Some(l), None, t)),
            );
            rows.extend(
                alignment
                    .right_only
                    .iter()
                    .map(|&(r, t)| (None, Some(r), t)),
            );
            rows.sort_by_key(|&(_, _, tick)| tick);
        }
    }

    let left_rows: UInt32Array = rows.iter().map(|&(l, _, _)| l).collect();
    let right_rows: UInt32Array = rows.iter().map(|&(_, r, _)| r).collect();
    let ticks: Int64Array = rows.iter().map(|&(_, _, t)| t).collect();

    let mut fields = Vec::with_capacity(left.num_columns() + 1);
    let mut arrays = Vec::with_capacity(left.num_columns() + 1);
    fields.push(Field::new(left_schema.field(0).name(), target.clone(), true));
    arrays.push(cast(&ticks, &target).context(ArrowSnafu)?);
    for (position, field) in left_schema.fields().iter().enumerate().skip(1) {
        fields.push(Field::new(field.name(), field.data_type().clone(), true));
        arrays.push(take(left.column(position).as_ref(), &left_rows, None).context(ArrowSnafu)?);
    }
    fields.push(Field::new(signal.name(), signal.data_type().clone(), true));
    arrays.push(take(right.column(1).as_ref(), &right_rows, None).context(ArrowSnafu)?);

    rebuild(fields, arrays).context(ArrowSnafu)
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::series::{ErrorKind, SeriesError};
    use arrow::array::{ArrayRef, Float64Array, TimestampSecondArray};
    use std::sync::Arc;

    #[test]
    fn split_scenario_a_yields_one_series_per_signal() -> TestResult {
        let ts = scenario_a()?;
        let parts = ts.split()?;

        assert_eq!(parts.len(), 2);
        for (part, name) in parts.iter().zip(["temperatura", "velocidade"]) {
            let names: Vec<String> = part
                .table()
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect();
            assert_eq!(names, vec!["timestamp".to_string(), name.to_string()]);
            assert_eq!(part.len(), 4);
            assert_eq!(part.feature_count(), 2);
            assert!(part.is_univariate());
        }
        Ok(())
    }

    #[test]
    fn split_rejects_long_series() -> TestResult {
        let long = scenario_a()?.to_long(false)?;
        assert_eq!(long.split().unwrap_err().kind(), ErrorKind::InvalidArgument);
        Ok(())
    }

    #[test]
    fn join_of_split_restores_columns() -> TestResult {
        let ts = scenario_a()?;
        let joined = TimeSeries::join(&ts.split()?)?;

        assert_eq!(joined.feature_count(), 3);
        assert_eq!(joined.table().schema(), ts.table().schema());
        assert_eq!(millis(&joined), millis(&ts));
        assert_eq!(
            f64_column(&joined, "velocidade"),
            f64_column(&ts, "velocidade")
        );
        Ok(())
    }

    #[test]
    fn single_member_is_returned_unchanged() -> TestResult {
        let a = univariate("a", vec![Some(1.0), Some(2.0)])?;
        let joined = TimeSeries::join(std::slice::from_ref(&a))?;
        assert_eq!(joined.table(), a.table());
        Ok(())
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = TimeSeries::join(&[]).unwrap_err();
        assert!(matches!(err, SeriesError::EmptyJoin));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn member_checks_name_the_offender() -> TestResult {
        let a = univariate("a", vec![Some(1.0)])?;
        let multi = scenario_a()?;
        let err = TimeSeries::join(&[a.clone(), multi]).unwrap_err();
        assert!(matches!(
            err,
            SeriesError::JoinMemberNotUnivariate { index: 1, columns: 3 }
        ));

        let long = a.clone().to_long(false)?;
        let err = TimeSeries::join(&[long, a]).unwrap_err();
        assert!(matches!(err, SeriesError::JoinMemberNotWide { index: 0, .. }));
        Ok(())
    }

    #[test]
    fn feature_count_must_be_two() -> TestResult {
        let a = univariate("a", vec![Some(1.0)])?;
        let b = TimeSeries::from_table(a.table().clone(), Format::Wide, 5)?;
        let err = TimeSeries::join(&[a, b]).unwrap_err();
        assert!(matches!(
            err,
            SeriesError::JoinMemberFeatureCount {
                index: 1,
                feature_count: 5
            }
        ));
        Ok(())
    }

    #[test]
    fn duplicate_signal_names_are_rejected() -> TestResult {
        let a = univariate("a", vec![Some(1.0)])?;
        let err = TimeSeries::join(&[a.clone(), a]).unwrap_err();
        assert!(matches!(err, SeriesError::DuplicateColumn { ref column } if column == "a"));
        Ok(())
    }

    fn offset_pair() -> SeriesResult<(TimeSeries, TimeSeries)> {
        let a = wide(
            &[0, 1, 2],
            vec![("a", Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])) as ArrayRef)],
        )?;
        let b = wide(
            &[1, 2, 3],
            vec![("b", Arc::new(Float64Array::from(vec![20.0, 30.0, 40.0])) as ArrayRef)],
        )?;
        Ok((a, b))
    }

    #[test]
    fn inner_join_drops_unshared_timestamps() -> TestResult {
        let (a, b) = offset_pair()?;
        let joined = TimeSeries::join(&[a, b])?;
        assert_eq!(millis(&joined), vec![Some(hour_millis(1)), Some(hour_millis(2))]);
        assert_eq!(f64_column(&joined, "a"), vec![Some(2.0), Some(3.0)]);
        assert_eq!(f64_column(&joined, "b"), vec![Some(20.0), Some(30.0)]);
        Ok(())
    }

    #[test]
    fn outer_join_keeps_every_timestamp() -> TestResult {
        let (a, b) = offset_pair()?;
        let joined = TimeSeries::join_with(&[a, b], JoinMode::Outer)?;
        assert_eq!(joined.len(), 4);
        assert_eq!(
            f64_column(&joined, "a"),
            vec![Some(1.0), Some(2.0), Some(3.0), None]
        );
        assert_eq!(
            f64_column(&joined, "b"),
            vec![None, Some(20.0), Some(30.0), Some(40.0)]
        );
        assert_eq!(millis(&joined)[3], Some(hour_millis(3)));
        Ok(())
    }

    #[test]
    fn exact_join_requires_identical_timestamps() -> TestResult {
        let (a, b) = offset_pair()?;
        let err = TimeSeries::join_with(&[a, b], JoinMode::Exact).unwrap_err();
        assert!(matches!(err, SeriesError::JoinTimestampMismatch { index: 1 }));
        Ok(())
    }

    #[test]
    fn member_time_unit_is_coerced_to_the_first() -> TestResult {
        let a = univariate("a", vec![Some(1.0), Some(2.0)])?;
        let seconds: Vec<i64> = (0..2).map(|h| hour_millis(h) / 1000).collect();
        let table = crate::table::table_from_columns(vec![
            ("time", Arc::new(TimestampSecondArray::from(seconds)) as ArrayRef),
            ("b", Arc::new(Float64Array::from(vec![5.0, 6.0])) as ArrayRef),
        ])?;
        let b = TimeSeries::from_table(table, Format::Wide, 2)?;

        let joined = TimeSeries::join(&[a.clone(), b])?;
        assert_eq!(
            joined.table().schema().field(0).data_type(),
            a.table().schema().field(0).data_type()
        );
        assert_eq!(f64_column(&joined, "b"), vec![Some(5.0), Some(6.0)]);
        Ok(())
    }
}
