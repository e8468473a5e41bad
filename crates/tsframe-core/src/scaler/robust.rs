//! Median/IQR rescaling, robust to outliers.

use arrow::array::Float64Array;

use super::{Scaler, ScalerParams, ScalerResult, fit_pairs, map_values, non_zero, quantile, sort_values};

/// Scales each column with `(x - median) / (q75 - q25)`.
///
/// Quantiles use linear interpolation between closest ranks. A zero
/// interquartile range is replaced by 1.
#[derive(Debug, Clone, Default)]
pub struct RobustScaler {
    fitted: Option<(Vec<f64>, Vec<f64>)>,
}

impl RobustScaler {
    /// Unfitted scaler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scaler for RobustScaler {
    fn name(&self) -> &str {
        "RobustScaler"
    }

    fn fit_transform(&mut self, columns: &[Float64Array]) -> ScalerResult<Vec<Float64Array>> {
        let (center, scale) = fit_pairs(columns, |values| {
            sort_values(values);
            let median = quantile(values, 0.5);
            let iqr = quantile(values, 0.75) - quantile(values, 0.25);
            (median, non_zero(iqr))
        })?;

        let out = columns
            .iter()
            .zip(center.iter().zip(&scale))
            .map(|(column, (&c, &s))| map_values(column, |x| (x - c) / s))
            .collect();

        self.fitted = Some((center, scale));
        Ok(out)
    }

    fn fitted_params(&self) -> Option<ScalerParams> {
        let (center, scale) = self.fitted.clone()?;
        Some(ScalerParams::Robust { center, scale })
    }
}
