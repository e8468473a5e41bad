//! Normalization with a recorded, invertible scale state.

use std::collections::HashSet;

use arrow::array::{ArrayRef, RecordBatch};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field};
use log::info;
use snafu::prelude::*;

use super::error::{
    ArrowSnafu, ColumnNotFoundSnafu, DuplicateColumnSnafu, MissingScaleStateSnafu,
    NoNumericColumnsSnafu, NotNumericSnafu, ScaleStateMismatchSnafu, ScalerSnafu,
    TimestampSelectedSnafu, UnsupportedScalerSnafu, WrongFormatSnafu,
};
use super::{Format, SeriesResult, TimeSeries};
use crate::scaler::{ScaleState, Scaler, ScalerParams};
use crate::table::{is_numeric, rebuild, to_f64};

/// Float32 columns stay Float32; every other numeric kind becomes Float64.
fn scaled_type(original: &DataType) -> DataType {
    match original {
        DataType::Float32 => DataType::Float32,
        _ => DataType::Float64,
    }
}

impl TimeSeries {
    /// Fit `scaler` on numeric columns and replace them with the scaled values.
    ///
    /// With `columns = None` every numeric non-timestamp column is used, in
    /// name order. An explicit list is used in the given order and each name
    /// must be an existing, numeric, non-timestamp column.
    ///
    /// The result records the fitted parameters as its scale state so that
    /// [`TimeSeries::denormalize`] can undo the transform.
    pub fn normalize<S: Scaler + ?Sized>(
        &mut self,
        scaler: &mut S,
        columns: Option<Vec<String>>,
        inplace: bool,
    ) -> SeriesResult<TimeSeries> {
        let selected = self.resolve_columns(columns)?;
        ensure!(!selected.is_empty(), NoNumericColumnsSnafu);

        let matrix = selected
            .iter()
            .map(|&(index, _)| to_f64(self.table.column(index).as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .context(ArrowSnafu)?;
        let scaled = scaler.fit_transform(&matrix).context(ScalerSnafu)?;

        let replacements = selected
            .iter()
            .zip(&scaled)
            .map(|(&(index, _), values)| {
                let target = scaled_type(self.table.schema().field(index).data_type());
                cast(values, &target).map(|array| (index, array))
            })
            .collect::<Result<Vec<_>, _>>()
            .context(ArrowSnafu)?;
        let table = replace_columns(&self.table, replacements)?;

        let state = ScaleState {
            scaler: scaler.name().to_string(),
            columns: selected.into_iter().map(|(_, name)| name).collect(),
            params: scaler.fitted_params().unwrap_or_else(|| ScalerParams::Opaque {
                name: scaler.name().to_string(),
            }),
        };
        info!(
            "normalized {} columns with {} ({})",
            state.columns.len(),
            state.scaler,
            state.params.family()
        );

        let next = TimeSeries {
            format: self.format,
            feature_count: self.feature_count,
            table,
            scale_state: Some(state),
        };
        Ok(self.commit(inplace, next))
    }

    /// Undo the last normalization using the recorded scale state.
    ///
    /// Only min-max and robust parameters can be inverted. Restored columns
    /// are Float64, or Float32 where the scaled column is Float32; restored
    /// values match the originals up to rounding. The result carries no
    /// scale state.
    ///
    /// A state recorded on wide columns cannot be applied after
    /// [`TimeSeries::to_long`]; such a long series is rejected as the wrong
    /// layout until it is converted back with [`TimeSeries::to_wide`].
    pub fn denormalize(&mut self, inplace: bool) -> SeriesResult<TimeSeries> {
        let state = self.scale_state.as_ref().context(MissingScaleStateSnafu)?;
        ensure!(
            state.params.is_invertible(),
            UnsupportedScalerSnafu {
                family: state.params.family(),
            }
        );

        let schema = self.table.schema();
        let columns_present = state
            .columns
            .iter()
            .all(|name| schema.column_with_name(name).is_some());
        ensure!(
            columns_present || self.format == Format::Wide,
            WrongFormatSnafu {
                operation: "denormalize",
                expected: Format::Wide,
                actual: self.format,
            }
        );
        let mut replacements = Vec::with_capacity(state.columns.len());
        for (position, name) in state.columns.iter().enumerate() {
            let (index, field) = schema
                .column_with_name(name)
                .context(ScaleStateMismatchSnafu { column: name })?;
            let scaled = to_f64(self.table.column(index).as_ref()).context(ArrowSnafu)?;
            let restored = state
                .params
                .inverse_column(position, &scaled)
                .context(ScaleStateMismatchSnafu { column: name })?;
            let array = cast(&restored, &scaled_type(field.data_type())).context(ArrowSnafu)?;
            replacements.push((index, array));
        }
        let table = replace_columns(&self.table, replacements)?;
        info!(
            "denormalized {} columns ({})",
            state.columns.len(),
            state.params.family()
        );

        let next = TimeSeries {
            format: self.format,
            feature_count: self.feature_count,
            table,
            scale_state: None,
        };
        Ok(self.commit(inplace, next))
    }

    /// `(index, name)` of the columns to scale.
    fn resolve_columns(&self, columns: Option<Vec<String>>) -> SeriesResult<Vec<(usize, String)>> {
        let schema = self.table.schema();
        let Some(columns) = columns else {
            return Ok(self
                .numeric_column_names()
                .into_iter()
                .filter_map(|name| schema.index_of(&name).ok().map(|index| (index, name)))
                .collect());
        };

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(columns.len());
        for name in columns {
            let (index, field) = schema
                .column_with_name(&name)
                .context(ColumnNotFoundSnafu { column: &name })?;
            ensure!(index != 0, TimestampSelectedSnafu { column: &name });
            ensure!(
                is_numeric(field.data_type()),
                NotNumericSnafu {
                    column: &name,
                    datatype: field.data_type().to_string(),
                }
            );
            ensure!(
                seen.insert(name.clone()),
                DuplicateColumnSnafu { column: &name }
            );
            resolved.push((index, name));
        }
        Ok(resolved)
    }
}

/// Copy of `table` with the given columns swapped out.
fn replace_columns(
    table: &RecordBatch,
    replacements: Vec<(usize, ArrayRef)>,
) -> SeriesResult<RecordBatch> {
    let schema = table.schema();
    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    let mut arrays: Vec<ArrayRef> = table.columns().to_vec();
    for (index, array) in replacements {
        let name = fields[index].name().clone();
        fields[index] = Field::new(name, array.data_type().clone(), true);
        arrays[index] = array;
    }
    rebuild(fields, arrays).context(ArrowSnafu)
}
