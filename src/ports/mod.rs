//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (classifier, LLM providers).

mod risk_predictor;
mod text_generator;

pub use risk_predictor::RiskPredictor;
pub use text_generator::{GenerationError, GenerationRequest, TextGenerator};
