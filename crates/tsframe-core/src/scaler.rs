//! Fit-and-apply numeric scalers with recoverable parameters.
//!
//! A [`Scaler`] is fitted on a column-major matrix of `f64` columns and returns
//! the transformed columns in the same layout. After fitting it exposes its
//! parameters as [`ScalerParams`], which is what a normalized
//! [`TimeSeries`](crate::series::TimeSeries) keeps so the transform can be
//! undone later.
//!
//! Missing cells (nulls and NaN) are skipped while fitting and pass through
//! the transform unchanged.
//!
//! Only two parameter families have closed-form inverses: min-max and robust.
//! [`StandardScaler`] and any [`ScalerParams::Opaque`] state can be applied
//! but not inverted.

mod min_max;
mod robust;
mod standard;

pub use min_max::MinMaxScaler;
pub use robust::RobustScaler;
pub use standard::StandardScaler;

use arrow::array::Float64Array;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Errors raised while fitting a scaler.
#[derive(Debug, Snafu, Clone, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum ScalerError {
    /// The input matrix has no columns.
    #[snafu(display("Cannot fit a scaler on an empty matrix"))]
    EmptyMatrix,

    /// A column has no finite values, so its parameters are undefined.
    #[snafu(display("Column {index} has no finite values to fit on"))]
    NoFiniteValues {
        /// Position of the column in the fitted matrix.
        index: usize,
    },

    /// The configured feature range is empty or reversed.
    #[snafu(display("Invalid feature range ({low}, {high}); expected low < high"))]
    InvalidFeatureRange {
        /// Requested lower bound.
        low: f64,
        /// Requested upper bound.
        high: f64,
    },
}

/// A convenience type alias for scaler results.
pub type ScalerResult<T> = Result<T, ScalerError>;

/// A transform that can be fitted on a matrix and report what it learned.
pub trait Scaler {
    /// Short human-readable name (e.g. "MinMaxScaler").
    fn name(&self) -> &str;

    /// Fit on `columns` and return the transformed columns, same shape.
    fn fit_transform(&mut self, columns: &[Float64Array]) -> ScalerResult<Vec<Float64Array>>;

    /// Parameters learned by the last successful fit, if any.
    fn fitted_params(&self) -> Option<ScalerParams>;
}

/// Per-column parameters learned by a scaler, tagged by family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ScalerParams {
    /// Min-max rescaling into `feature_range`.
    MinMax {
        /// Target `(low, high)` range of the transform.
        feature_range: (f64, f64),
        /// Observed minimum per column.
        data_min: Vec<f64>,
        /// Observed maximum per column.
        data_max: Vec<f64>,
    },
    /// Median/IQR rescaling.
    Robust {
        /// Median per column.
        center: Vec<f64>,
        /// Interquartile range per column (1.0 where the range was zero).
        scale: Vec<f64>,
    },
    /// Z-score rescaling.
    Standard {
        /// Mean per column.
        mean: Vec<f64>,
        /// Population standard deviation per column (1.0 where it was zero).
        std: Vec<f64>,
    },
    /// A scaler whose parameters are not exposed.
    Opaque {
        /// Name reported by the scaler.
        name: String,
    },
}

impl ScalerParams {
    /// Family label used in logs and errors.
    pub fn family(&self) -> &str {
        match self {
            ScalerParams::MinMax { .. } => "min_max",
            ScalerParams::Robust { .. } => "robust",
            ScalerParams::Standard { .. } => "standard",
            ScalerParams::Opaque { name } => name,
        }
    }

    /// Whether [`ScalerParams::inverse_column`] is defined for this family.
    pub fn is_invertible(&self) -> bool {
        matches!(self, ScalerParams::MinMax { .. } | ScalerParams::Robust { .. })
    }

    /// Undo the transform for the `index`-th fitted column.
    ///
    /// Returns `None` for families without a closed-form inverse or when
    /// `index` is out of range.
    pub fn inverse_column(&self, index: usize, scaled: &Float64Array) -> Option<Float64Array> {
        match self {
            ScalerParams::MinMax {
                feature_range: (low, high),
                data_min,
                data_max,
            } => {
                let (min, max) = (*data_min.get(index)?, *data_max.get(index)?);
                let span = high - low;
                Some(map_values(scaled, |s| (s - low) / span * (max - min) + min))
            }
            ScalerParams::Robust { center, scale } => {
                let (center, scale) = (*center.get(index)?, *scale.get(index)?);
                Some(map_values(scaled, |s| s * scale + center))
            }
            ScalerParams::Standard { .. } | ScalerParams::Opaque { .. } => None,
        }
    }
}

/// Fitted state recorded on a normalized time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleState {
    /// Name of the scaler that produced the state.
    pub scaler: String,
    /// Columns the scaler was fitted on, in matrix order.
    pub columns: Vec<String>,
    /// Learned parameters, one entry per column.
    pub params: ScalerParams,
}

// ---- shared helpers ----

/// Apply `f` to every present value, keeping nulls as nulls.
pub(crate) fn map_values(column: &Float64Array, f: impl Fn(f64) -> f64) -> Float64Array {
    column.iter().map(|v| v.map(&f)).collect()
}

/// Finite (non-null, non-NaN, non-infinite) values of a column.
pub(crate) fn finite_values(column: &Float64Array) -> Vec<f64> {
    column.iter().flatten().filter(|v| v.is_finite()).collect()
}

/// Fit one `(p1, p2)` pair per column with `fit`, failing on empty columns.
pub(crate) fn fit_pairs(
    columns: &[Float64Array],
    fit: impl Fn(&mut Vec<f64>) -> (f64, f64),
) -> ScalerResult<(Vec<f64>, Vec<f64>)> {
    ensure!(!columns.is_empty(), EmptyMatrixSnafu);

    let mut first = Vec::with_capacity(columns.len());
    let mut second = Vec::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        let mut values = finite_values(column);
        ensure!(!values.is_empty(), NoFiniteValuesSnafu { index });
        let (a, b) = fit(&mut values);
        first.push(a);
        second.push(b);
    }
    Ok((first, second))
}

/// Quantile with linear interpolation between closest ranks (numpy default).
///
/// `sorted` must be non-empty and ascending.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let position = (sorted.len() - 1) as f64 * q;
    let lo = position.floor() as usize;
    let hi = position.ceil() as usize;
    let frac = position - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub(crate) fn sort_values(values: &mut [f64]) {
    values.sort_by(f64::total_cmp);
}

/// Replace a zero scale with 1 so constant columns do not divide by zero.
pub(crate) fn non_zero(scale: f64) -> f64 {
    if scale == 0.0 { 1.0 } else { scale }
}
