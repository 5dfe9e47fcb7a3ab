//! Gradient-boosted decision tree pipeline.
//!
//! Training is a pure function of the dataset:
//!
//! 1. Shuffle row indices with a fixed-seed ChaCha RNG and hold out 20%
//! 2. Fit a [`StandardScaler`] on the training partition only
//! 3. Fit a [`GradientBoostingClassifier`] on the scaled training rows
//! 4. Score accuracy on the held-out partition
//!
//! Two calls on the same dataset produce identical pipelines.

mod boosting;
mod scaler;
mod tree;

pub use boosting::{BoostingParams, GradientBoostingClassifier};
pub use scaler::StandardScaler;
pub use tree::{Node, RegressionTree};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::adapters::dataset::{Dataset, DatasetError};
use crate::domain::{FeatureVector, PredictionResult, FEATURE_COUNT};
use crate::ports::RiskPredictor;

/// Seed for the train/test shuffle.
pub const SPLIT_SEED: u64 = 42;

/// Percentage of rows held out for evaluation.
pub const TEST_PERCENT: usize = 20;

/// Scaler followed by the boosted classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    scaler: StandardScaler,
    classifier: GradientBoostingClassifier,
}

impl Pipeline {
    /// Positive-class probability for one raw (unscaled) row.
    #[must_use]
    pub fn predict_proba_row(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        self.classifier.predict_proba(&self.scaler.transform(row))
    }

    /// 0/1 label for one raw row.
    #[must_use]
    pub fn predict_row(&self, row: &[f64; FEATURE_COUNT]) -> u8 {
        u8::from(self.predict_proba_row(row) > 0.5)
    }

    #[must_use]
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    #[must_use]
    pub fn classifier(&self) -> &GradientBoostingClassifier {
        &self.classifier
    }
}

impl RiskPredictor for Pipeline {
    fn predict(&self, features: &FeatureVector) -> PredictionResult {
        PredictionResult::from_probability(self.predict_proba_row(&features.to_row()))
    }
}

/// Summary of one training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub train_rows: usize,
    pub test_rows: usize,
    /// Held-out accuracy (0.0 to 1.0); `None` when nothing was held out.
    pub test_accuracy: Option<f64>,
}

/// Fitted pipeline plus the exact feature column order it expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub pipeline: Pipeline,
    pub feature_names: Vec<String>,
    pub report: TrainingReport,
}

impl RiskPredictor for TrainedModel {
    fn predict(&self, features: &FeatureVector) -> PredictionResult {
        self.pipeline.predict(features)
    }
}

/// Deterministic shuffled split into `(train, test)` row indices.
///
/// The test partition gets `ceil(n * test_percent / 100)` rows, always
/// leaving at least one training row.
#[must_use]
pub fn train_test_split(n: usize, test_percent: usize, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = (n * test_percent).div_ceil(100).min(n.saturating_sub(1));
    let train = indices.split_off(n_test);
    (train, indices)
}

/// Train the pipeline with the default hyperparameters.
///
/// # Errors
/// Returns `DatasetError` if the training partition is empty or has a
/// single outcome class.
pub fn train(dataset: &Dataset) -> Result<TrainedModel, DatasetError> {
    train_with(dataset, BoostingParams::default())
}

/// Train the pipeline with explicit hyperparameters.
///
/// # Errors
/// See [`train`].
pub fn train_with(dataset: &Dataset, params: BoostingParams) -> Result<TrainedModel, DatasetError> {
    if dataset.is_empty() {
        return Err(DatasetError::Empty);
    }

    let (train_idx, test_idx) = train_test_split(dataset.len(), TEST_PERCENT, SPLIT_SEED);
    let rows = dataset.rows();
    let labels = dataset.labels();

    let train_rows: Vec<[f64; FEATURE_COUNT]> = train_idx.iter().map(|&i| rows[i]).collect();
    let train_labels: Vec<u8> = train_idx.iter().map(|&i| labels[i]).collect();

    tracing::info!(
        "Training gradient boosting ({} trees, depth {}, lr {}) on {} rows",
        params.n_estimators,
        params.max_depth,
        params.learning_rate,
        train_rows.len()
    );

    let scaler = StandardScaler::fit(&train_rows);
    let scaled: Vec<[f64; FEATURE_COUNT]> = train_rows.iter().map(|r| scaler.transform(r)).collect();
    let classifier = GradientBoostingClassifier::fit(&scaled, &train_labels, params)?;
    let pipeline = Pipeline { scaler, classifier };

    let test_accuracy = if test_idx.is_empty() {
        None
    } else {
        let correct = test_idx
            .iter()
            .filter(|&&i| pipeline.predict_row(&rows[i]) == labels[i])
            .count();
        Some(correct as f64 / test_idx.len() as f64)
    };

    let report = TrainingReport {
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
        test_accuracy,
    };

    if let Some(acc) = test_accuracy {
        tracing::info!(
            "Training complete: held-out accuracy {:.2}% on {} rows",
            acc * 100.0,
            report.test_rows
        );
    }

    Ok(TrainedModel {
        pipeline,
        feature_names: dataset.feature_names(),
        report,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Synthetic dataset where high BMI, HbA1c and glucose mean diabetes.

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use crate::adapters::dataset::Dataset;
    use crate::domain::FEATURE_COUNT;

    pub fn synthetic_dataset(n: usize) -> Dataset {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut rows = Vec::with_capacity(n);
        let mut labels = Vec::with_capacity(n);

        for i in 0..n {
            let diabetic = i % 3 == 0;
            let (bmi, hba1c, glucose) = if diabetic {
                (
                    rng.gen_range(29.0..40.0),
                    rng.gen_range(6.3..9.0),
                    rng.gen_range(140.0..260.0),
                )
            } else {
                (
                    rng.gen_range(17.0..27.0),
                    rng.gen_range(4.0..5.9),
                    rng.gen_range(70.0..130.0),
                )
            };
            let row: [f64; FEATURE_COUNT] = [
                f64::from(rng.gen_range(0u8..=1)),
                f64::from(rng.gen_range(18u32..80)),
                f64::from(rng.gen_range(0u8..=1)),
                f64::from(rng.gen_range(0u8..=1)),
                f64::from(rng.gen_range(0u8..=5)),
                bmi,
                hba1c,
                glucose,
            ];
            rows.push(row);
            labels.push(u8::from(diabetic));
        }

        Dataset::from_parts(rows, labels)
    }

    /// Write a dataset as CSV with the canonical header.
    pub fn write_csv(dataset: &Dataset, path: &std::path::Path) {
        let mut writer = csv::Writer::from_path(path).expect("create csv");
        let mut header: Vec<&str> = crate::domain::FEATURE_NAMES.to_vec();
        header.push(crate::domain::LABEL_COLUMN);
        writer.write_record(&header).expect("write header");

        for (row, label) in dataset.rows().iter().zip(dataset.labels()) {
            let mut record: Vec<String> = row.iter().map(ToString::to_string).collect();
            record.push(label.to_string());
            writer.write_record(&record).expect("write row");
        }
        writer.flush().expect("flush csv");
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::synthetic_dataset;
    use super::*;
    use crate::domain::FeatureInput;

    fn vector(raw: [&str; FEATURE_COUNT]) -> FeatureVector {
        FeatureInput {
            gender: raw[0].into(),
            age: raw[1].into(),
            hypertension: raw[2].into(),
            heart_disease: raw[3].into(),
            smoking_history: raw[4].into(),
            bmi: raw[5].into(),
            hba1c: raw[6].into(),
            blood_glucose: raw[7].into(),
        }
        .parse()
        .expect("Valid vector")
    }

    #[test]
    fn test_split_is_deterministic_and_partitions() {
        let (train_a, test_a) = train_test_split(101, TEST_PERCENT, SPLIT_SEED);
        let (train_b, test_b) = train_test_split(101, TEST_PERCENT, SPLIT_SEED);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 21);
        assert_eq!(train_a.len(), 80);

        let mut all: Vec<usize> = train_a.iter().chain(&test_a).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..101).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_keeps_one_training_row() {
        let (train, test) = train_test_split(1, TEST_PERCENT, SPLIT_SEED);
        assert_eq!(train.len(), 1);
        assert!(test.is_empty());
    }

    #[test]
    fn test_train_reports_feature_order() {
        let model = train(&synthetic_dataset(150)).expect("Should train");
        assert_eq!(
            model.feature_names,
            vec![
                "gender",
                "age",
                "hypertension",
                "heart_disease",
                "smoking_history",
                "bmi",
                "HbA1c_level",
                "blood_glucose_level"
            ]
        );
        assert_eq!(model.report.train_rows, 120);
        assert_eq!(model.report.test_rows, 30);
        assert!(model.report.test_accuracy.unwrap_or(0.0) > 0.95);
    }

    #[test]
    fn test_training_is_deterministic() {
        let dataset = synthetic_dataset(150);
        let a = train(&dataset).expect("Should train");
        let b = train(&dataset).expect("Should train");

        assert_eq!(
            serde_json::to_string(&a.pipeline).expect("serialize"),
            serde_json::to_string(&b.pipeline).expect("serialize")
        );

        let probes = [
            vector(["1", "45", "1", "0", "4", "31.2", "6.8", "160"]),
            vector(["0", "22", "0", "0", "4", "19.0", "4.5", "85"]),
            vector(["0", "60", "1", "1", "1", "27.5", "6.0", "135"]),
        ];
        for probe in &probes {
            let (pa, pb) = (a.predict(probe), b.predict(probe));
            assert_eq!(pa.label(), pb.label());
            assert_eq!(pa.probability().to_bits(), pb.probability().to_bits());
        }
    }

    #[test]
    fn test_scenario_high_risk_vector_is_diabetic() {
        let model = train(&synthetic_dataset(300)).expect("Should train");
        let high = vector(["1", "45", "1", "0", "4", "31.2", "6.8", "160"]);
        assert_eq!(model.predict(&high).label(), 1);
    }

    #[test]
    fn test_scenario_low_risk_vector_is_not_diabetic() {
        let model = train(&synthetic_dataset(300)).expect("Should train");
        let low = vector(["0", "22", "0", "0", "4", "19.0", "4.5", "85"]);
        assert_eq!(model.predict(&low).label(), 0);
    }

    #[test]
    fn test_single_class_training_set_is_rejected() {
        let rows = vec![[0.0; FEATURE_COUNT]; 10];
        let dataset = Dataset::from_parts(rows, vec![0; 10]);
        assert!(matches!(train(&dataset), Err(DatasetError::SingleClass)));
    }
}
