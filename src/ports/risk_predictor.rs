//! Risk predictor port: Trait for the fitted diabetes classifier.

use crate::domain::{FeatureVector, PredictionResult};

/// A fitted, read-only classifier over the eight-feature schema.
///
/// Implementations must be deterministic: the same vector always yields
/// the same result.
pub trait RiskPredictor: Send + Sync {
    /// Predict the diabetes label for one validated feature vector.
    fn predict(&self, features: &FeatureVector) -> PredictionResult;
}
