//! Glycoguide: diabetes risk screening with personalized advice.
//!
//! Main entry point for the terminal application.

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use glycoguide::adapters::{self, sanitize::SanitizingMakeWriter};
use glycoguide::application::{AdviceService, Consultation, ModelCache};
use glycoguide::config::{LogMode, Settings};
use glycoguide::ports::RiskPredictor;
use glycoguide::tui::App;

fn main() -> Result<()> {
    let settings = Settings::from_env().context("Invalid configuration")?;

    // Logs on the terminal would corrupt the TUI (alternate screen).
    let use_file = match settings.log_mode {
        LogMode::File => true,
        LogMode::Stdout => false,
        LogMode::Auto => std::io::stdout().is_terminal(),
    };

    let (writer, _guard) = if use_file {
        if let Some(parent) = settings.log_file.parent() {
            // Best-effort: don't fail startup just because the directory is missing.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&settings.log_file)
            .with_context(|| format!("Cannot open log file {}", settings.log_file.display()))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting Glycoguide...");

    // Train before the UI starts; there is nothing to show without a model.
    let cache = ModelCache::new(settings.dataset_path.clone());
    let model = cache.get_or_train().with_context(|| {
        format!(
            "Failed to train the risk model from {}",
            settings.dataset_path.display()
        )
    })?;
    let report = model.report;

    let advice = settings
        .credentials()
        .and_then(adapters::text_generator)
        .map(AdviceService::new);
    match &advice {
        Ok(service) => tracing::info!("Advice via {} ({})", service.provider(), service.model()),
        Err(e) => tracing::warn!("Advice disabled: {}", e),
    }

    let predictor: Arc<dyn RiskPredictor> = model;
    let mut app = App::new(Consultation::new(predictor, advice), report);
    app.run()?;

    tracing::info!("Glycoguide shutdown complete.");
    Ok(())
}
