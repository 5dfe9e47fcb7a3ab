//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

pub mod advice;
pub mod consultation;
pub mod risk;

pub use advice::AdviceService;
pub use consultation::{Assessment, Consultation, Progress, QUICK_QUESTIONS};
pub use risk::ModelCache;
