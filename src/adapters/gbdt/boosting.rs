//! Binary gradient boosting with logistic loss.
//!
//! Each stage fits a least-squares tree to the residuals `y - p` and then
//! replaces every leaf value with one Newton step,
//! `sum(y - p) / sum(p * (1 - p))`, over the rows in that leaf.

use serde::{Deserialize, Serialize};

use super::tree::{grow, presort, RegressionTree};
use crate::adapters::dataset::DatasetError;
use crate::domain::FEATURE_COUNT;

/// Hyperparameters for [`GradientBoostingClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
        }
    }
}

/// Fitted additive ensemble of regression trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    params: BoostingParams,
    init_score: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostingClassifier {
    /// Fit on (already scaled) rows and 0/1 labels.
    ///
    /// # Errors
    /// Returns `DatasetError::Empty` with no rows and
    /// `DatasetError::SingleClass` when only one label is present.
    pub fn fit(
        rows: &[[f64; FEATURE_COUNT]],
        labels: &[u8],
        params: BoostingParams,
    ) -> Result<Self, DatasetError> {
        let n = rows.len();
        if n == 0 {
            return Err(DatasetError::Empty);
        }
        let positives = labels.iter().filter(|&&y| y == 1).count();
        if positives == 0 || positives == n {
            return Err(DatasetError::SingleClass);
        }

        let prior = positives as f64 / n as f64;
        let init_score = (prior / (1.0 - prior)).ln();
        let targets: Vec<f64> = labels.iter().map(|&y| f64::from(y)).collect();

        let sorted = presort(rows);
        let mut raw = vec![init_score; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for stage in 0..params.n_estimators {
            let probs: Vec<f64> = raw.iter().map(|&f| sigmoid(f)).collect();
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&probs)
                .map(|(y, p)| y - p)
                .collect();

            let mut grown = grow(rows, &sorted, &residuals, params.max_depth);

            let node_count = grown.tree.nodes().len();
            let mut numerator = vec![0.0; node_count];
            let mut denominator = vec![0.0; node_count];
            for (i, &leaf) in grown.assignment.iter().enumerate() {
                numerator[leaf] += residuals[i];
                denominator[leaf] += probs[i] * (1.0 - probs[i]);
            }

            let mut leaf_values = vec![0.0; node_count];
            for leaf in 0..node_count {
                if denominator[leaf].abs() > 1e-150 {
                    leaf_values[leaf] = numerator[leaf] / denominator[leaf];
                }
                grown.tree.set_leaf_value(leaf, leaf_values[leaf]);
            }

            for (f, &leaf) in raw.iter_mut().zip(&grown.assignment) {
                *f += params.learning_rate * leaf_values[leaf];
            }

            if (stage + 1) % 25 == 0 {
                tracing::debug!(
                    "Boosting stage {}/{}: training deviance {:.5}",
                    stage + 1,
                    params.n_estimators,
                    deviance(&targets, &raw)
                );
            }

            trees.push(grown.tree);
        }

        Ok(Self {
            params,
            init_score,
            trees,
        })
    }

    /// Raw additive score (log-odds of the positive class).
    #[must_use]
    pub fn decision_function(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        self.init_score
            + self.params.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    /// Probability of the positive class.
    #[must_use]
    pub fn predict_proba(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        sigmoid(self.decision_function(row))
    }

    #[must_use]
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    #[must_use]
    pub fn params(&self) -> BoostingParams {
        self.params
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Mean binomial deviance of raw scores.
fn deviance(targets: &[f64], raw: &[f64]) -> f64 {
    let total: f64 = targets
        .iter()
        .zip(raw)
        .map(|(y, f)| {
            // log(1 + e^f) computed without overflow
            let softplus = if *f > 0.0 {
                f + (-f).exp().ln_1p()
            } else {
                f.exp().ln_1p()
            };
            softplus - y * f
        })
        .sum();
    2.0 * total / targets.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(x: f64) -> [f64; FEATURE_COUNT] {
        [x, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
    }

    #[test]
    fn test_rejects_single_class() {
        let rows = vec![row(1.0), row(2.0)];
        let err = GradientBoostingClassifier::fit(&rows, &[1, 1], BoostingParams::default())
            .expect_err("Should fail");
        assert!(matches!(err, DatasetError::SingleClass));
    }

    #[test]
    fn test_init_score_is_prior_log_odds() {
        let rows = vec![row(1.0), row(2.0), row(3.0), row(4.0)];
        let params = BoostingParams {
            n_estimators: 0,
            ..BoostingParams::default()
        };
        let model =
            GradientBoostingClassifier::fit(&rows, &[0, 0, 0, 1], params).expect("Should fit");
        let expected = (0.25_f64 / 0.75).ln();
        assert!((model.decision_function(&row(0.0)) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_learns_threshold() {
        let rows: Vec<_> = (0..40).map(|i| row(f64::from(i))).collect();
        let labels: Vec<u8> = (0..40).map(|i| u8::from(i >= 20)).collect();
        let model = GradientBoostingClassifier::fit(&rows, &labels, BoostingParams::default())
            .expect("Should fit");

        assert_eq!(model.trees().len(), 100);
        assert!(model.trees().iter().all(|t| t.depth() <= 3));
        assert!(model.predict_proba(&row(5.0)) < 0.1);
        assert!(model.predict_proba(&row(35.0)) > 0.9);
    }

    #[test]
    fn test_deviance_decreases_with_stages() {
        let rows: Vec<_> = (0..60).map(|i| row(f64::from(i % 13))).collect();
        let labels: Vec<u8> = (0..60).map(|i| u8::from(i % 13 > 6)).collect();
        let targets: Vec<f64> = labels.iter().map(|&y| f64::from(y)).collect();

        let score = |n_estimators| {
            let model = GradientBoostingClassifier::fit(
                &rows,
                &labels,
                BoostingParams {
                    n_estimators,
                    ..BoostingParams::default()
                },
            )
            .expect("Should fit");
            let raw: Vec<f64> = rows.iter().map(|r| model.decision_function(r)).collect();
            deviance(&targets, &raw)
        };

        assert!(score(10) < score(1));
        assert!(score(50) < score(10));
    }
}
