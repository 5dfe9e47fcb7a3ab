//! CSV dataset loading for classifier training.
//!
//! Expects a header row naming the eight feature columns (see
//! [`FEATURE_NAMES`]) and the binary `diabetes` outcome column, in any order.
//! Categorical cells may hold the numeric code or the label used by the
//! public dataset (`Female`, `never`, `No Info`, ...).

use std::path::{Path, PathBuf};

use crate::domain::{
    yes_no_from_code, Gender, SmokingHistory, FEATURE_COUNT, FEATURE_NAMES, LABEL_COLUMN,
};

/// Errors raised while reading the training dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Cannot open dataset {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset is not valid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset is missing column \"{0}\"")]
    MissingColumn(String),

    #[error("Line {line}: invalid value {value:?} in column \"{column}\"")]
    InvalidCell {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("Dataset contains no usable rows")]
    Empty,

    #[error("Training data contains only one outcome class")]
    SingleClass,
}

/// In-memory training table: numeric feature rows plus 0/1 labels.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<[f64; FEATURE_COUNT]>,
    labels: Vec<u8>,
    skipped: usize,
}

impl Dataset {
    /// Build a dataset from already-encoded rows.
    ///
    /// # Panics
    /// Panics if `rows` and `labels` differ in length.
    #[must_use]
    pub fn from_parts(rows: Vec<[f64; FEATURE_COUNT]>, labels: Vec<u8>) -> Self {
        assert_eq!(rows.len(), labels.len(), "one label per row");
        Self {
            rows,
            labels,
            skipped: 0,
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[[f64; FEATURE_COUNT]] {
        &self.rows
    }

    #[must_use]
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows dropped because a category lies outside the model's domain.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Ordered feature column names.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect()
    }
}

/// Read a dataset from a CSV file.
///
/// # Errors
/// Returns `DatasetError` if the file is missing, is not CSV, lacks a
/// required column, contains an unparseable cell, or has no usable rows.
pub fn load_dataset(path: &Path) -> Result<Dataset, DatasetError> {
    tracing::info!("Loading dataset from {:?}", path);

    let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = read_dataset(file)?;

    tracing::info!(
        "Loaded {} rows ({} skipped with out-of-domain categories)",
        dataset.len(),
        dataset.skipped()
    );
    Ok(dataset)
}

/// Read a dataset from any CSV source.
///
/// # Errors
/// Same as [`load_dataset`], minus file access.
pub fn read_dataset<R: std::io::Read>(source: R) -> Result<Dataset, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let column_index = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    };

    let mut feature_columns = [0usize; FEATURE_COUNT];
    for (slot, name) in feature_columns.iter_mut().zip(FEATURE_NAMES) {
        *slot = column_index(name)?;
    }
    let label_column = column_index(LABEL_COLUMN)?;

    let mut dataset = Dataset::default();

    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let cell = |column: usize| record.get(column).unwrap_or("");

        let mut row = [0.0; FEATURE_COUNT];
        let mut in_domain = true;
        for (i, (&column, &name)) in feature_columns.iter().zip(FEATURE_NAMES.iter()).enumerate()
        {
            let raw = cell(column);
            let parsed = match i {
                0 => match parse_gender(raw) {
                    GenderCell::Known(g) => Some(f64::from(g.code())),
                    GenderCell::OutOfDomain => {
                        in_domain = false;
                        Some(0.0)
                    }
                    GenderCell::Invalid => None,
                },
                2 | 3 => parse_flag(raw),
                4 => parse_smoking(raw).map(|s| f64::from(s.code())),
                _ => raw.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0),
            };

            row[i] = parsed.ok_or_else(|| DatasetError::InvalidCell {
                line,
                column: name,
                value: raw.to_string(),
            })?;
        }

        let raw_label = cell(label_column);
        let label = parse_flag(raw_label).ok_or_else(|| DatasetError::InvalidCell {
            line,
            column: LABEL_COLUMN,
            value: raw_label.to_string(),
        })?;

        if !in_domain {
            dataset.skipped += 1;
            continue;
        }

        dataset.rows.push(row);
        dataset.labels.push(label as u8);
    }

    if dataset.is_empty() {
        return Err(DatasetError::Empty);
    }

    if dataset.skipped > 0 {
        tracing::warn!(
            "Skipped {} rows whose gender is outside {{Female, Male}}",
            dataset.skipped
        );
    }

    Ok(dataset)
}

enum GenderCell {
    Known(Gender),
    OutOfDomain,
    Invalid,
}

fn parse_gender(raw: &str) -> GenderCell {
    if let Some(g) = parse_code(raw).and_then(Gender::from_code) {
        return GenderCell::Known(g);
    }
    if let Some(g) = Gender::from_label(raw) {
        return GenderCell::Known(g);
    }
    if raw.eq_ignore_ascii_case("other") {
        GenderCell::OutOfDomain
    } else {
        GenderCell::Invalid
    }
}

fn parse_smoking(raw: &str) -> Option<SmokingHistory> {
    parse_code(raw)
        .and_then(SmokingHistory::from_code)
        .or_else(|| SmokingHistory::from_label(raw))
}

fn parse_flag(raw: &str) -> Option<f64> {
    parse_code(raw)
        .and_then(yes_no_from_code)
        .map(|flag| f64::from(u8::from(flag)))
}

/// Integer code, tolerating a trailing `.0` (`"1.0"`).
fn parse_code(raw: &str) -> Option<u8> {
    let value: f64 = raw.parse().ok()?;
    if value.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(&value) {
        Some(value as u8)
    } else {
        None
    }
}
