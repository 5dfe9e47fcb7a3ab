//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no I/O.
//! All types are serializable and implement strict validation.

mod diagnosis;
mod patient;
mod session;

pub use diagnosis::{DiabetesStatus, PredictionResult};
pub use patient::{
    yes_no_from_code, yes_no_from_label, yes_no_label, FeatureInput, FeatureVector, Field,
    Gender, SmokingHistory, ValidationError, ValidationErrors, FEATURE_COUNT, FEATURE_NAMES,
    LABEL_COLUMN,
};
pub use session::{AdviceContext, ChatMessage, Role, Session};
