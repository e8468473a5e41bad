//! The `TimeSeries` entity.
//!
//! A [`TimeSeries`] wraps an Arrow [`RecordBatch`] whose column 0 is the
//! timestamp axis, together with a layout tag ([`Format`]), a declared
//! feature count, and the state of the last normalization (if any).
//!
//! Layouts:
//! - **Wide**: columns `1..N` are one signal each; the column name is the
//!   signal identifier.
//! - **Long**: exactly three columns, addressed by position: timestamp,
//!   signal id ([`SIGNAL_ID_COLUMN`]) and value ([`VALUE_COLUMN`]).
//!
//! Every transformation takes an `inplace` flag. With `inplace = true` the
//! receiver is replaced by the result and a copy of the new state is
//! returned; otherwise the receiver is left untouched and a new series is
//! returned. `split` and `join` always build new series.
//!
//! Operations live in submodules:
//! - `convert`: [`TimeSeries::to_long`] / [`TimeSeries::to_wide`].
//! - `split`: [`TimeSeries::split`] / [`TimeSeries::join`] with [`JoinMode`].
//! - `normalize`: [`TimeSeries::normalize`] / [`TimeSeries::denormalize`].
//! - `impute`: [`TimeSeries::add_gap_mask`].

mod convert;
mod error;
mod impute;
mod normalize;
mod split;

#[cfg(test)]
pub(crate) mod test_util;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{Array, RecordBatch};
use arrow::datatypes::Schema;
use arrow::util::pretty::pretty_format_batches;
use log::debug;
use snafu::prelude::*;

use crate::common::time_column::ensure_timestamp_first;
use crate::scaler::ScaleState;
use crate::table::{is_numeric, to_strings};

pub use error::{ErrorKind, SeriesError, SeriesResult};
pub use impute::GAP_MASK_SUFFIX;
pub use split::JoinMode;

use error::{InvalidTimeColumnSnafu, UnknownFormatSnafu};

/// Name of the signal id column produced by [`TimeSeries::to_long`].
pub const SIGNAL_ID_COLUMN: &str = "signal_id";

/// Name of the value column produced by [`TimeSeries::to_long`].
pub const VALUE_COLUMN: &str = "value";

/// Table layout of a [`TimeSeries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// One row per timestamp, one column per signal.
    Wide,
    /// One row per `(timestamp, signal)` pair.
    Long,
}

impl Format {
    /// Lowercase tag used in metadata and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Wide => "wide",
            Format::Long => "long",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wide" => Ok(Format::Wide),
            "long" => Ok(Format::Long),
            _ => UnknownFormatSnafu { value: s }.fail(),
        }
    }
}

/// A timestamp-indexed table tagged with its layout.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    format: Format,
    feature_count: usize,
    table: RecordBatch,
    scale_state: Option<ScaleState>,
}

impl TimeSeries {
    /// Wrap `table` as a time series.
    ///
    /// Fails with a construction error when the table has no columns or when
    /// column 0 is not a timestamp; the message names the offending type.
    /// `feature_count` is stored as given and is not checked against the
    /// column count.
    pub fn from_table(
        table: RecordBatch,
        format: Format,
        feature_count: usize,
    ) -> SeriesResult<Self> {
        ensure_timestamp_first(&table.schema()).context(InvalidTimeColumnSnafu)?;
        debug!(
            "constructed {format} time series: {} rows, {} columns, {feature_count} features",
            table.num_rows(),
            table.num_columns()
        );
        Ok(Self {
            format,
            feature_count,
            table,
            scale_state: None,
        })
    }

    /// Placeholder series with no columns, before a read fills it in.
    ///
    /// This is the only way to get a series without a timestamp column.
    pub fn empty() -> Self {
        Self {
            format: Format::Long,
            feature_count: 0,
            table: RecordBatch::new_empty(Arc::new(Schema::empty())),
            scale_state: None,
        }
    }

    /// Attach a previously recorded scale state, e.g. one read back from disk.
    pub fn with_scale_state(mut self, state: Option<ScaleState>) -> Self {
        self.scale_state = state;
        self
    }

    /// Layout of the table.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Declared feature count.
    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// The underlying table.
    pub fn table(&self) -> &RecordBatch {
        &self.table
    }

    /// Consume the series and return its table.
    pub fn into_table(self) -> RecordBatch {
        self.table
    }

    /// State of the last normalization, if any.
    pub fn scale_state(&self) -> Option<&ScaleState> {
        self.scale_state.as_ref()
    }

    /// Name of column 0, or `None` for the empty placeholder.
    pub fn timestamp_column_name(&self) -> Option<String> {
        self.table
            .schema()
            .fields()
            .first()
            .map(|field| field.name().clone())
    }

    /// Non-timestamp columns with a numeric type, sorted by name.
    pub fn numeric_column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .table
            .schema()
            .fields()
            .iter()
            .skip(1)
            .filter(|field| is_numeric(field.data_type()))
            .map(|field| field.name().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.table.num_rows()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.table.num_rows() == 0
    }

    /// Number of columns, timestamp included.
    pub fn column_count(&self) -> usize {
        self.table.num_columns()
    }

    /// Number of signals carried by the series.
    ///
    /// Wide: the non-timestamp column count. Long: the distinct values of the
    /// signal id column, a null id counting as one value.
    pub fn signal_count(&self) -> usize {
        match self.format {
            Format::Wide => self.table.num_columns().saturating_sub(1),
            Format::Long => {
                if self.table.num_columns() < 2 {
                    return 0;
                }
                let Ok(ids) = to_strings(self.table.column(1).as_ref()) else {
                    return 0;
                };
                (0..ids.len())
                    .map(|row| ids.is_valid(row).then(|| ids.value(row)))
                    .collect::<HashSet<_>>()
                    .len()
            }
        }
    }

    /// Exactly one signal.
    pub fn is_univariate(&self) -> bool {
        self.signal_count() == 1
    }

    /// Two or more signals.
    pub fn is_multivariate(&self) -> bool {
        self.signal_count() >= 2
    }

    /// Apply the `inplace` contract: adopt `next` when asked, then return it.
    fn commit(&mut self, inplace: bool, next: TimeSeries) -> TimeSeries {
        if inplace {
            *self = next.clone();
        }
        next
    }
}

impl fmt::Display for TimeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "TimeSeries(format={}, features={}, rows={})",
            self.format,
            self.feature_count,
            self.len()
        )?;
        match pretty_format_batches(std::slice::from_ref(&self.table)) {
            Ok(rendered) => write!(f, "{rendered}"),
            Err(_) => f.write_str("<table cannot be rendered>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;
    use crate::table::table_from_columns;
    use arrow::array::{ArrayRef, Int64Array, StringArray};

    #[test]
    fn format_parses_case_insensitively() -> TestResult {
        assert_eq!("Wide".parse::<Format>()?, Format::Wide);
        assert_eq!(" long ".parse::<Format>()?, Format::Long);
        let err = "tall".parse::<Format>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
        assert_eq!(Format::Long.to_string(), "long");
        Ok(())
    }

    #[test]
    fn integer_index_is_rejected_naming_its_type() -> TestResult {
        let table = table_from_columns(vec![
            ("idx", Arc::new(Int64Array::from(vec![0, 1])) as ArrayRef),
            ("a", Arc::new(Int64Array::from(vec![5, 6])) as ArrayRef),
        ])?;
        let err = TimeSeries::from_table(table, Format::Wide, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
        assert!(err.to_string().contains("Int64"));
        Ok(())
    }

    #[test]
    fn empty_placeholder_bypasses_timestamp_check() {
        let ts = TimeSeries::empty();
        assert_eq!(ts.format(), Format::Long);
        assert_eq!(ts.feature_count(), 0);
        assert_eq!(ts.column_count(), 0);
        assert!(ts.is_empty());
        assert!(ts.timestamp_column_name().is_none());
        assert!(!ts.is_univariate());
    }

    #[test]
    fn wide_cardinality_follows_column_count() -> TestResult {
        let ts = scenario_a()?;
        assert!(ts.is_multivariate());
        assert!(!ts.is_univariate());
        assert_eq!(ts.timestamp_column_name().as_deref(), Some("timestamp"));
        assert_eq!(ts.numeric_column_names(), vec!["temperatura", "velocidade"]);
        Ok(())
    }

    #[test]
    fn long_cardinality_counts_distinct_ids() -> TestResult {
        let table = table_from_columns(vec![
            ("timestamp", timestamps(&[0, 0, 1])),
            (
                SIGNAL_ID_COLUMN,
                Arc::new(StringArray::from(vec!["a", "a", "a"])) as ArrayRef,
            ),
            (
                VALUE_COLUMN,
                Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef,
            ),
        ])?;
        let ts = TimeSeries::from_table(table, Format::Long, 2)?;
        assert!(ts.is_univariate());
        assert_eq!(ts.signal_count(), 1);
        Ok(())
    }

    #[test]
    fn clone_is_independent_of_inplace_changes() -> TestResult {
        let mut ts = scenario_a()?;
        let snapshot = ts.clone();
        ts.to_long(true)?;
        assert_eq!(ts.format(), Format::Long);
        assert_eq!(snapshot.format(), Format::Wide);
        assert_eq!(snapshot.column_count(), 3);
        Ok(())
    }

    #[test]
    fn display_includes_header_and_rows() -> TestResult {
        let rendered = scenario_a()?.to_string();
        assert!(rendered.starts_with("TimeSeries(format=wide, features=3, rows=4)"));
        assert!(rendered.contains("temperatura"));
        Ok(())
    }
}
