//! Min-max rescaling into a target feature range.

use arrow::array::Float64Array;
use snafu::prelude::*;

use super::{
    InvalidFeatureRangeSnafu, Scaler, ScalerParams, ScalerResult, fit_pairs, map_values, non_zero,
};

/// Rescales each column so its observed `[min, max]` maps onto
/// `feature_range`, `[-1, 1]` by default.
///
/// A constant column maps onto the lower bound of the range.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    feature_range: (f64, f64),
    fitted: Option<(Vec<f64>, Vec<f64>)>,
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self {
            feature_range: (-1.0, 1.0),
            fitted: None,
        }
    }
}

impl MinMaxScaler {
    /// Scaler with the default `[-1, 1]` range.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scaler targeting `(low, high)`; requires `low < high`.
    pub fn with_feature_range(low: f64, high: f64) -> ScalerResult<Self> {
        ensure!(low < high, InvalidFeatureRangeSnafu { low, high });
        Ok(Self {
            feature_range: (low, high),
            fitted: None,
        })
    }

    /// Target range of the transform.
    pub fn feature_range(&self) -> (f64, f64) {
        self.feature_range
    }
}

impl Scaler for MinMaxScaler {
    fn name(&self) -> &str {
        "MinMaxScaler"
    }

    fn fit_transform(&mut self, columns: &[Float64Array]) -> ScalerResult<Vec<Float64Array>> {
        let (data_min, data_max) = fit_pairs(columns, |values| {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (min, max)
        })?;

        let (low, high) = self.feature_range;
        let out = columns
            .iter()
            .zip(data_min.iter().zip(&data_max))
            .map(|(column, (&min, &max))| {
                let scale = (high - low) / non_zero(max - min);
                map_values(column, |x| (x - min) * scale + low)
            })
            .collect();

        self.fitted = Some((data_min, data_max));
        Ok(out)
    }

    fn fitted_params(&self) -> Option<ScalerParams> {
        let (data_min, data_max) = self.fitted.clone()?;
        Some(ScalerParams::MinMax {
            feature_range: self.feature_range,
            data_min,
            data_max,
        })
    }
}
