//! Per-feature standardization (zero mean, unit variance).

use serde::{Deserialize, Serialize};

use crate::domain::FEATURE_COUNT;

/// Mean/deviation scaler fit on the training partition only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    /// Fit on a set of rows using the population standard deviation.
    ///
    /// Constant columns get a scale of 1 so they pass through centered.
    #[must_use]
    pub fn fit(rows: &[[f64; FEATURE_COUNT]]) -> Self {
        let mut mean = [0.0; FEATURE_COUNT];
        let mut scale = [1.0; FEATURE_COUNT];
        if rows.is_empty() {
            return Self { mean, scale };
        }

        let n = rows.len() as f64;
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = [0.0; FEATURE_COUNT];
        for row in rows {
            for j in 0..FEATURE_COUNT {
                let d = row[j] - mean[j];
                var[j] += d * d;
            }
        }
        for j in 0..FEATURE_COUNT {
            let std = (var[j] / n).sqrt();
            if std > f64::EPSILON {
                scale[j] = std;
            }
        }

        Self { mean, scale }
    }

    #[must_use]
    pub fn transform(&self, row: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for j in 0..FEATURE_COUNT {
            out[j] = (row[j] - self.mean[j]) / self.scale[j];
        }
        out
    }

    #[must_use]
    pub fn mean(&self) -> &[f64; FEATURE_COUNT] {
        &self.mean
    }

    #[must_use]
    pub fn scale(&self) -> &[f64; FEATURE_COUNT] {
        &self.scale
    }
}
