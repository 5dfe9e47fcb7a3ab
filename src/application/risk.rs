//! Risk model service: one-time training and shared prediction.
//!
//! The fitted pipeline is built at most once per [`ModelCache`] and then
//! shared read-only behind an `Arc`. There is a single dataset source, so
//! the cache holds a single entry and is only invalidated by dropping it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::adapters::dataset::load_dataset;
use crate::adapters::gbdt::{self, TrainedModel};
use crate::domain::{FeatureVector, PredictionResult};
use crate::ports::RiskPredictor;
use crate::GlycoError;

/// Lazily trained, memoized classifier for one dataset path.
pub struct ModelCache {
    dataset_path: PathBuf,
    model: OnceCell<Arc<TrainedModel>>,
    fits: AtomicUsize,
}

impl ModelCache {
    #[must_use]
    pub fn new(dataset_path: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            model: OnceCell::new(),
            fits: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    /// Return the trained model, training it on first use.
    ///
    /// Concurrent first callers block until the single training run
    /// finishes. A failed run leaves the cache empty.
    ///
    /// # Errors
    /// Returns `GlycoError::DataAccess` if the dataset cannot be loaded or
    /// trained on.
    pub fn get_or_train(&self) -> Result<Arc<TrainedModel>, GlycoError> {
        self.model
            .get_or_try_init(|| {
                self.fits.fetch_add(1, Ordering::SeqCst);
                let started = std::time::Instant::now();

                let dataset = load_dataset(&self.dataset_path)?;
                let model = gbdt::train(&dataset)?;

                tracing::info!(
                    "Model trained in {:.2}s ({} training rows)",
                    started.elapsed().as_secs_f64(),
                    model.report.train_rows
                );
                Ok(Arc::new(model))
            })
            .cloned()
    }

    /// The trained model, if training already succeeded.
    #[must_use]
    pub fn get(&self) -> Option<Arc<TrainedModel>> {
        self.model.get().cloned()
    }

    /// How many times training has been attempted.
    #[must_use]
    pub fn fit_count(&self) -> usize {
        self.fits.load(Ordering::SeqCst)
    }
}

/// Predict through the cache, training first if needed.
///
/// # Errors
/// See [`ModelCache::get_or_train`].
pub fn predict(cache: &ModelCache, features: &FeatureVector) -> Result<PredictionResult, GlycoError> {
    let model = cache.get_or_train()?;
    Ok(model.predict(features))
}
