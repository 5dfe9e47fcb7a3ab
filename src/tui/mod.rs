//! TUI module: Terminal User Interface using Ratatui.
//!
//! Screens:
//! - Dashboard with model and advice status
//! - Health metrics input
//! - Prediction with streamed advice
//! - Follow-up chat

mod app;
mod styles;
mod ui;
mod worker;

pub use app::{App, Screen};
pub use styles::MedicalTheme;
pub use worker::{ConsultationWorker, WorkerEvent, WorkerHandle};
