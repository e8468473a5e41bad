//! Gap overlay column for univariate series.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::datatypes::Field;
use log::debug;
use snafu::prelude::*;

use super::error::{
    ArrowSnafu, DuplicateColumnSnafu, GapSnafu, NotNumericSnafu, NotUnivariateSnafu,
    WrongFormatSnafu,
};
use super::{Format, SeriesResult, TimeSeries};
use crate::gaps::{GapRun, encode_runs};
use crate::table::{is_numeric, missing_mask, rebuild, to_f64};

/// Suffix of the overlay column added by [`TimeSeries::add_gap_mask`].
pub const GAP_MASK_SUFFIX: &str = "_nan";

impl TimeSeries {
    /// Append a `<signal>_nan` column that shows how each gap is filled.
    ///
    /// The new column holds linearly interpolated values inside every gap,
    /// plus the observed values of the two rows that bound it; all other
    /// rows are null. A gap that runs to the end of the table has no right
    /// bound and stays null. A series whose first value is missing is
    /// rejected like in gap analysis.
    ///
    /// Requires a univariate wide series with a numeric signal. The result's
    /// feature count is its new column count.
    pub fn add_gap_mask(&mut self, inplace: bool) -> SeriesResult<TimeSeries> {
        ensure!(
            self.format == Format::Wide,
            WrongFormatSnafu {
                operation: "add_gap_mask",
                expected: Format::Wide,
                actual: self.format,
            }
        );
        ensure!(
            self.table.num_columns() == 2,
            NotUnivariateSnafu {
                operation: "add_gap_mask"
            }
        );

        let schema = self.table.schema();
        let signal = schema.field(1);
        ensure!(
            is_numeric(signal.data_type()),
            NotNumericSnafu {
                column: signal.name(),
                datatype: signal.data_type().to_string(),
            }
        );
        let mask_name = format!("{}{GAP_MASK_SUFFIX}", signal.name());
        ensure!(
            schema.column_with_name(&mask_name).is_none(),
            DuplicateColumnSnafu { column: &mask_name }
        );

        let column = self.table.column(1);
        let runs = encode_runs(signal.name(), &missing_mask(column.as_ref())).context(GapSnafu)?;
        let values = to_f64(column.as_ref()).context(ArrowSnafu)?;
        let overlay: ArrayRef = Arc::new(interpolate_gaps(&values, &runs));
        debug!(
            "gap mask for {}: {} filled rows",
            signal.name(),
            overlay.len() - overlay.null_count()
        );

        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        fields.push(Field::new(&mask_name, overlay.data_type().clone(), true));
        let mut arrays = self.table.columns().to_vec();
        arrays.push(overlay);
        let table = rebuild(fields, arrays).context(ArrowSnafu)?;

        let next = TimeSeries {
            format: Format::Wide,
            feature_count: table.num_columns(),
            table,
            scale_state: self.scale_state.clone(),
        };
        Ok(self.commit(inplace, next))
    }
}

/// Linear fill of every bounded gap in `values`; null outside gaps.
fn interpolate_gaps(values: &Float64Array, runs: &[GapRun]) -> Float64Array {
    let mut out: Vec<Option<f64>> = vec![None; values.len()];
    for run in runs.iter().filter(|run| run.is_missing) {
        // leading gaps are rejected before we get here, so start_index >= 1
        let left = run.start_index - 1;
        let right = run.end_index();
        out[left] = Some(values.value(left));
        if right >= values.len() {
            continue;
        }

        let (y0, y1) = (values.value(left), values.value(right));
        let width = (right - left) as f64;
        for (step, row) in (run.start_index..right).enumerate() {
            let fraction = (step + 1) as f64 / width;
            out[row] = Some(y0 + (y1 - y0) * fraction);
        }
        out[right] = Some(y1);
    }
    Float64Array::from(out)
}
