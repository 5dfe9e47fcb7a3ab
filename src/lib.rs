//! # Glycoguide
//!
//! Diabetes risk screening with personalized, LLM-generated advice.
//!
//! This crate provides:
//! - A gradient-boosted risk classifier trained once from a tabular dataset
//! - Advice and follow-up answers from an external chat-completion service
//! - Terminal UI for entering metrics and chatting about the result
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (features, prediction, session)
//! - `ports`: Trait definitions for prediction and text generation
//! - `adapters`: Dataset loading, boosted trees, OpenAI/Gemini clients
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Environment-sourced settings
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{AdviceContext, FeatureVector, PredictionResult, Session};

/// Main error type for Glycoguide
#[derive(Debug, thiserror::Error)]
pub enum GlycoError {
    #[error("Invalid input: {0}")]
    Validation(#[from] domain::ValidationErrors),

    #[error("Invalid input: the question is empty")]
    EmptyQuestion,

    #[error("Dataset error: {0}")]
    DataAccess(#[from] adapters::dataset::DatasetError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("Advice service failed: {0}")]
    ExternalService(#[from] ports::GenerationError),
}
