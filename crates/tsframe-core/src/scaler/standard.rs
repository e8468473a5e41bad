//! Z-score standardization.

use arrow::array::Float64Array;

use super::{Scaler, ScalerParams, ScalerResult, fit_pairs, map_values, non_zero};

/// Scales each column with `(x - mean) / std` (population deviation).
///
/// Fitting and transforming work, but the resulting state has no registered
/// inverse, so a series normalized with it cannot be denormalized.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    fitted: Option<(Vec<f64>, Vec<f64>)>,
}

impl StandardScaler {
    /// Unfitted scaler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scaler for StandardScaler {
    fn name(&self) -> &str {
        "StandardScaler"
    }

    fn fit_transform(&mut self, columns: &[Float64Array]) -> ScalerResult<Vec<Float64Array>> {
        let (mean, std) = fit_pairs(columns, |values| {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            (mean, non_zero(variance.sqrt()))
        })?;

        let out = columns
            .iter()
            .zip(mean.iter().zip(&std))
            .map(|(column, (&m, &s))| map_values(column, |x| (x - m) / s))
            .collect();

        self.fitted = Some((mean, std));
        Ok(out)
    }

    fn fitted_params(&self) -> Option<ScalerParams> {
        let (mean, std) = self.fitted.clone()?;
        Some(ScalerParams::Standard { mean, std })
    }
}
