//! Prediction result types.
//!
//! Represents the output of the diabetes risk classifier.

use serde::{Deserialize, Serialize};

/// Binary diabetes classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiabetesStatus {
    /// Label 0
    NotDiabetic,
    /// Label 1
    Diabetic,
}

impl DiabetesStatus {
    /// Model label (0 or 1).
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::NotDiabetic => 0,
            Self::Diabetic => 1,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::NotDiabetic),
            1 => Some(Self::Diabetic),
            _ => None,
        }
    }

    /// Wording used inside prompts ("The person is diabetic").
    #[must_use]
    pub fn prompt_label(self) -> &'static str {
        match self {
            Self::NotDiabetic => "not diabetic",
            Self::Diabetic => "diabetic",
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::NotDiabetic => "Negative (Not Diabetic)",
            Self::Diabetic => "Positive (Diabetic)",
        }
    }
}

impl std::fmt::Display for DiabetesStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotDiabetic => write!(f, "NEGATIVE"),
            Self::Diabetic => write!(f, "POSITIVE"),
        }
    }
}

/// Result of one classifier prediction. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    status: DiabetesStatus,

    /// Positive-class probability (0.0 to 1.0)
    probability: f64,

    created_at: chrono::DateTime<chrono::Utc>,
}

impl PredictionResult {
    /// Build a result from the positive-class probability.
    ///
    /// The label is 1 only when the probability is strictly above 0.5.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        let status = if probability > 0.5 {
            DiabetesStatus::Diabetic
        } else {
            DiabetesStatus::NotDiabetic
        };

        Self {
            status,
            probability,
            created_at: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn status(&self) -> DiabetesStatus {
        self.status
    }

    /// Binary label: 0 = not diabetic, 1 = diabetic.
    #[must_use]
    pub fn label(&self) -> u8 {
        self.status.code()
    }

    #[must_use]
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Confidence in the predicted label (0.5 to 1.0).
    #[must_use]
    pub fn confidence(&self) -> f64 {
        match self.status {
            DiabetesStatus::Diabetic => self.probability,
            DiabetesStatus::NotDiabetic => 1.0 - self.probability,
        }
    }

    #[must_use]
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_threshold() {
        assert_eq!(PredictionResult::from_probability(0.1).label(), 0);
        assert_eq!(PredictionResult::from_probability(0.5).label(), 0);
        assert_eq!(PredictionResult::from_probability(0.51).label(), 1);
        assert_eq!(
            PredictionResult::from_probability(0.9).status(),
            DiabetesStatus::Diabetic
        );
    }

    #[test]
    fn test_confidence() {
        let result = PredictionResult::from_probability(0.2);
        assert!((result.confidence() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_status_codes() {
        for status in [DiabetesStatus::NotDiabetic, DiabetesStatus::Diabetic] {
            assert_eq!(DiabetesStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(DiabetesStatus::from_code(2), None);
    }
}
