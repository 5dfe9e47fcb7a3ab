//! Patient feature types for diabetes risk prediction.
//!
//! Eight clinical and demographic features, in the fixed column order the
//! classifier is trained on:
//! gender, age, hypertension, heart_disease, smoking_history, bmi,
//! HbA1c_level, blood_glucose_level

use serde::{Deserialize, Serialize};

/// Number of model features.
pub const FEATURE_COUNT: usize = 8;

/// Dataset column names, in model order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "gender",
    "age",
    "hypertension",
    "heart_disease",
    "smoking_history",
    "bmi",
    "HbA1c_level",
    "blood_glucose_level",
];

/// Name of the binary outcome column.
pub const LABEL_COLUMN: &str = "diabetes";

/// Biological sex as coded in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Female, Gender::Male];

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Female => 0,
            Self::Male => 1,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Female),
            1 => Some(Self::Male),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
        }
    }

    /// Case-insensitive label lookup.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// Smoking history category.
///
/// Codes: 0=No Info, 1=Current, 2=Ever, 3=Former, 4=Never, 5=Not Current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmokingHistory {
    NoInfo,
    Current,
    Ever,
    Former,
    Never,
    NotCurrent,
}

impl SmokingHistory {
    pub const ALL: [SmokingHistory; 6] = [
        SmokingHistory::NoInfo,
        SmokingHistory::Current,
        SmokingHistory::Ever,
        SmokingHistory::Former,
        SmokingHistory::Never,
        SmokingHistory::NotCurrent,
    ];

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::NoInfo => 0,
            Self::Current => 1,
            Self::Ever => 2,
            Self::Former => 3,
            Self::Never => 4,
            Self::NotCurrent => 5,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NoInfo => "No Info",
            Self::Current => "Current",
            Self::Ever => "Ever",
            Self::Former => "Former",
            Self::Never => "Never",
            Self::NotCurrent => "Not Current",
        }
    }

    /// Case-insensitive label lookup (`"never"`, `"No Info"`, `"not current"`...).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// Label for a 0/1 condition flag.
#[must_use]
pub fn yes_no_label(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Parse a 0/1 condition flag from its label.
#[must_use]
pub fn yes_no_from_label(label: &str) -> Option<bool> {
    match label.trim().to_ascii_lowercase().as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

/// Parse a 0/1 condition flag from its code.
#[must_use]
pub fn yes_no_from_code(code: u8) -> Option<bool> {
    match code {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

/// One input field of the assessment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Gender,
    Age,
    Hypertension,
    HeartDisease,
    SmokingHistory,
    Bmi,
    Hba1c,
    BloodGlucose,
}

impl Field {
    pub const ALL: [Field; FEATURE_COUNT] = [
        Field::Gender,
        Field::Age,
        Field::Hypertension,
        Field::HeartDisease,
        Field::SmokingHistory,
        Field::Bmi,
        Field::Hba1c,
        Field::BloodGlucose,
    ];

    /// Human-readable field name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Gender => "Gender",
            Self::Age => "Age",
            Self::Hypertension => "Hypertension",
            Self::HeartDisease => "Heart disease",
            Self::SmokingHistory => "Smoking history",
            Self::Bmi => "BMI",
            Self::Hba1c => "HbA1c",
            Self::BloodGlucose => "Blood glucose",
        }
    }

    /// Dataset column backing this field.
    #[must_use]
    pub fn column(self) -> &'static str {
        FEATURE_NAMES[self as usize]
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: Field,
    pub reason: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Every field that failed validation, in form order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    /// Fields that were rejected.
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        self.0.iter().map(|e| e.field).collect()
    }

    #[must_use]
    pub fn single(field: Field, reason: impl Into<String>) -> Self {
        Self(vec![ValidationError {
            field,
            reason: reason.into(),
        }])
    }
}

/// Validated feature vector. Only constructed through [`FeatureInput::parse`]
/// or [`FeatureVector::from_row`], so every instance is in-domain.
///
/// Serialized as its [`FeatureInput`] form; deserializing re-runs validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FeatureInput", into = "FeatureInput")]
pub struct FeatureVector {
    gender: Gender,
    age: u32,
    hypertension: bool,
    heart_disease: bool,
    smoking_history: SmokingHistory,
    bmi: f64,
    hba1c: f64,
    blood_glucose: f64,
}

impl FeatureVector {
    #[must_use]
    pub fn gender(&self) -> Gender {
        self.gender
    }

    /// Age in whole years.
    #[must_use]
    pub fn age(&self) -> u32 {
        self.age
    }

    #[must_use]
    pub fn hypertension(&self) -> bool {
        self.hypertension
    }

    #[must_use]
    pub fn heart_disease(&self) -> bool {
        self.heart_disease
    }

    #[must_use]
    pub fn smoking_history(&self) -> SmokingHistory {
        self.smoking_history
    }

    #[must_use]
    pub fn bmi(&self) -> f64 {
        self.bmi
    }

    /// HbA1c level, percent.
    #[must_use]
    pub fn hba1c(&self) -> f64 {
        self.hba1c
    }

    /// Blood glucose, mg/dL.
    #[must_use]
    pub fn blood_glucose(&self) -> f64 {
        self.blood_glucose
    }

    /// Numeric row in model column order.
    #[must_use]
    pub fn to_row(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.gender.code()),
            f64::from(self.age),
            f64::from(u8::from(self.hypertension)),
            f64::from(u8::from(self.heart_disease)),
            f64::from(self.smoking_history.code()),
            self.bmi,
            self.hba1c,
            self.blood_glucose,
        ]
    }

    /// Rebuild a vector from a numeric row, checking every domain.
    ///
    /// # Errors
    /// Returns every out-of-domain field.
    pub fn from_row(row: &[f64; FEATURE_COUNT]) -> Result<Self, ValidationErrors> {
        let input = FeatureInput {
            gender: code_text(row[0]),
            age: code_text(row[1]),
            hypertension: code_text(row[2]),
            heart_disease: code_text(row[3]),
            smoking_history: code_text(row[4]),
            bmi: row[5].to_string(),
            hba1c: row[6].to_string(),
            blood_glucose: row[7].to_string(),
        };
        input.parse()
    }

    /// `(field, human-readable value)` pairs, in form order.
    #[must_use]
    pub fn describe(&self) -> Vec<(Field, String)> {
        vec![
            (Field::Gender, self.gender.label().to_string()),
            (Field::Age, self.age.to_string()),
            (Field::Hypertension, yes_no_label(self.hypertension).to_string()),
            (Field::HeartDisease, yes_no_label(self.heart_disease).to_string()),
            (Field::SmokingHistory, self.smoking_history.label().to_string()),
            (Field::Bmi, self.bmi.to_string()),
            (Field::Hba1c, self.hba1c.to_string()),
            (Field::BloodGlucose, self.blood_glucose.to_string()),
        ]
    }
}

fn code_text(value: f64) -> String {
    if value.fract() == 0.0 && value >= 0.0 {
        format!("{}", value as u64)
    } else {
        value.to_string()
    }
}

/// Raw, untrusted field values as entered by the user.
///
/// Categorical fields accept either the code (`"1"`) or the label (`"Male"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureInput {
    pub gender: String,
    pub age: String,
    pub hypertension: String,
    pub heart_disease: String,
    pub smoking_history: String,
    pub bmi: String,
    pub hba1c: String,
    pub blood_glucose: String,
}

impl FeatureInput {
    /// Raw value of one field.
    #[must_use]
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Gender => &self.gender,
            Field::Age => &self.age,
            Field::Hypertension => &self.hypertension,
            Field::HeartDisease => &self.heart_disease,
            Field::SmokingHistory => &self.smoking_history,
            Field::Bmi => &self.bmi,
            Field::Hba1c => &self.hba1c,
            Field::BloodGlucose => &self.blood_glucose,
        }
    }

    /// Mutable raw value of one field.
    pub fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Gender => &mut self.gender,
            Field::Age => &mut self.age,
            Field::Hypertension => &mut self.hypertension,
            Field::HeartDisease => &mut self.heart_disease,
            Field::SmokingHistory => &mut self.smoking_history,
            Field::Bmi => &mut self.bmi,
            Field::Hba1c => &mut self.hba1c,
            Field::BloodGlucose => &mut self.blood_glucose,
        }
    }

    /// Validate every field and build a [`FeatureVector`].
    ///
    /// Missing values are rejected, never defaulted.
    ///
    /// # Errors
    /// Returns all invalid fields at once, in form order.
    pub fn parse(&self) -> Result<FeatureVector, ValidationErrors> {
        let mut errors = Vec::new();
        let mut reject = |field: Field, reason: String| {
            errors.push(ValidationError { field, reason });
        };

        let gender = parse_categorical(&self.gender, Gender::from_code, Gender::from_label)
            .map_err(|r| reject(Field::Gender, r))
            .ok();
        let age = parse_age(&self.age).map_err(|r| reject(Field::Age, r)).ok();
        let hypertension =
            parse_categorical(&self.hypertension, yes_no_from_code, yes_no_from_label)
                .map_err(|r| reject(Field::Hypertension, r))
                .ok();
        let heart_disease =
            parse_categorical(&self.heart_disease, yes_no_from_code, yes_no_from_label)
                .map_err(|r| reject(Field::HeartDisease, r))
                .ok();
        let smoking_history = parse_categorical(
            &self.smoking_history,
            SmokingHistory::from_code,
            SmokingHistory::from_label,
        )
        .map_err(|r| reject(Field::SmokingHistory, r))
        .ok();
        let bmi = parse_positive(&self.bmi)
            .map_err(|r| reject(Field::Bmi, r))
            .ok();
        let hba1c = parse_positive(&self.hba1c)
            .map_err(|r| reject(Field::Hba1c, r))
            .ok();
        let blood_glucose = parse_positive(&self.blood_glucose)
            .map_err(|r| reject(Field::BloodGlucose, r))
            .ok();

        match (
            gender,
            age,
            hypertension,
            heart_disease,
            smoking_history,
            bmi,
            hba1c,
            blood_glucose,
        ) {
            (
                Some(gender),
                Some(age),
                Some(hypertension),
                Some(heart_disease),
                Some(smoking_history),
                Some(bmi),
                Some(hba1c),
                Some(blood_glucose),
            ) => Ok(FeatureVector {
                gender,
                age,
                hypertension,
                heart_disease,
                smoking_history,
                bmi,
                hba1c,
                blood_glucose,
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

impl TryFrom<FeatureInput> for FeatureVector {
    type Error = ValidationErrors;

    fn try_from(input: FeatureInput) -> Result<Self, Self::Error> {
        input.parse()
    }
}

impl From<FeatureVector> for FeatureInput {
    fn from(v: FeatureVector) -> Self {
        Self::from(&v)
    }
}

impl From<&FeatureVector> for FeatureInput {
    fn from(v: &FeatureVector) -> Self {
        Self {
            gender: v.gender.label().to_string(),
            age: v.age.to_string(),
            hypertension: yes_no_label(v.hypertension).to_string(),
            heart_disease: yes_no_label(v.heart_disease).to_string(),
            smoking_history: v.smoking_history.label().to_string(),
            bmi: v.bmi.to_string(),
            hba1c: v.hba1c.to_string(),
            blood_glucose: v.blood_glucose.to_string(),
        }
    }
}

fn parse_categorical<T>(
    raw: &str,
    from_code: impl Fn(u8) -> Option<T>,
    from_label: impl Fn(&str) -> Option<T>,
) -> Result<T, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("a choice is required".to_string());
    }
    if let Ok(code) = raw.parse::<u8>() {
        return from_code(code).ok_or_else(|| format!("unknown code {code}"));
    }
    from_label(raw).ok_or_else(|| format!("unknown choice \"{raw}\""))
}

fn parse_age(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("a value is required".to_string());
    }
    if !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("\"{raw}\" is not a whole number of years"));
    }
    raw.parse::<u32>()
        .map_err(|_| format!("\"{raw}\" is out of range"))
}

fn parse_positive(raw: &str) -> Result<f64, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("a value is required".to_string());
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("\"{raw}\" is not a number"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{raw} must be greater than 0"));
    }
    Ok(value)
}
