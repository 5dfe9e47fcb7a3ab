//! Consultation handlers tying prediction, advice and chat together.
//!
//! Every handler takes the current [`Session`] by reference and, on success,
//! returns the next one. On failure the caller keeps its old session, so an
//! earlier prediction and its advice survive a failed request.

use std::sync::Arc;

use crate::config::ConfigError;
use crate::domain::{AdviceContext, FeatureVector, PredictionResult, Session};
use crate::ports::RiskPredictor;
use crate::GlycoError;

use super::advice::AdviceService;

/// Shortcut questions offered in the chat view.
pub const QUICK_QUESTIONS: [&str; 5] = [
    "What foods should I eat / avoid?",
    "Can I exercise? What type is best?",
    "How do I monitor my blood sugar at home?",
    "What are the long-term risks if I ignore this?",
    "When should I see a doctor?",
];

/// Progress reported while an assessment runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress<'a> {
    /// The classifier has answered; advice is about to be requested.
    Predicted(PredictionResult),
    /// Next piece of advice text.
    Chunk(&'a str),
}

/// Outcome of a successful assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub prediction: PredictionResult,
    pub advice: String,
}

/// Prediction plus advice, with the advice backend possibly unavailable.
#[derive(Clone)]
pub struct Consultation {
    predictor: Arc<dyn RiskPredictor>,
    advice: Result<AdviceService, ConfigError>,
}

impl Consultation {
    /// `advice` carries the startup configuration problem when no text
    /// generator could be set up; advice and chat then fail fast with it.
    pub fn new(
        predictor: Arc<dyn RiskPredictor>,
        advice: Result<AdviceService, ConfigError>,
    ) -> Self {
        Self { predictor, advice }
    }

    /// The configuration problem that disables advice, if any.
    #[must_use]
    pub fn config_error(&self) -> Option<&ConfigError> {
        self.advice.as_ref().err()
    }

    #[must_use]
    pub fn advice_service(&self) -> Option<&AdviceService> {
        self.advice.as_ref().ok()
    }

    fn require_advice(&self) -> Result<&AdviceService, GlycoError> {
        self.advice
            .as_ref()
            .map_err(|e| GlycoError::Configuration(e.clone()))
    }

    /// Classifier output for one validated vector.
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> PredictionResult {
        self.predictor.predict(features)
    }

    /// Predict, then request advice for the prediction.
    ///
    /// On success the returned session holds a fresh [`AdviceContext`] and
    /// the previous chat history.
    ///
    /// # Errors
    /// Returns `GlycoError::Configuration` when advice is unavailable (no
    /// call is made) and `GlycoError::ExternalService` when the call fails.
    /// The prediction is still reported through `on_progress` first.
    pub fn assess(
        &self,
        session: &Session,
        features: &FeatureVector,
        on_progress: &mut dyn FnMut(Progress<'_>),
    ) -> Result<(Session, Assessment), GlycoError> {
        let prediction = self.predict(features);
        tracing::info!("Prediction: {}", prediction.status());
        on_progress(Progress::Predicted(prediction));

        let service = self.require_advice()?;
        let advice = service.generate_initial_advice(features, prediction.status(), &mut |chunk| {
            on_progress(Progress::Chunk(chunk));
        })?;

        let next = session.with_context(AdviceContext {
            prediction,
            features: *features,
            advice: advice.clone(),
        });
        Ok((next, Assessment { prediction, advice }))
    }

    /// Answer a follow-up question grounded on the session's context.
    ///
    /// On success the returned session's history gains the question and the
    /// answer.
    ///
    /// # Errors
    /// Returns `GlycoError::EmptyQuestion` for a blank question,
    /// `GlycoError::Configuration` when advice is unavailable and
    /// `GlycoError::ExternalService` when the call fails.
    pub fn ask(
        &self,
        session: &Session,
        question: &str,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<(Session, String), GlycoError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(GlycoError::EmptyQuestion);
        }

        let service = self.require_advice()?;
        let answer = service.generate_followup_answer(session.context.as_ref(), question, on_chunk)?;
        Ok((session.with_exchange(question, &answer), answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ScriptedGenerator;
    use crate::domain::{DiabetesStatus, FeatureInput, Role};
    use crate::ports::{GenerationError, TextGenerator};

    /// Fixed-output predictor.
    struct Always(f64);

    impl RiskPredictor for Always {
        fn predict(&self, _features: &FeatureVector) -> PredictionResult {
            PredictionResult::from_probability(self.0)
        }
    }

    fn features() -> FeatureVector {
        FeatureInput {
            gender: "Male".into(),
            age: "45".into(),
            hypertension: "Yes".into(),
            heart_disease: "No".into(),
            smoking_history: "Never".into(),
            bmi: "31.2".into(),
            hba1c: "6.8".into(),
            blood_glucose: "160".into(),
        }
        .parse()
        .expect("Valid")
    }

    fn consultation(generator: &Arc<ScriptedGenerator>, probability: f64) -> Consultation {
        let service = AdviceService::new(Arc::clone(generator) as Arc<dyn TextGenerator>);
        Consultation::new(Arc::new(Always(probability)), Ok(service))
    }

    fn outage() -> GenerationError {
        GenerationError::Transport {
            provider: "Scripted".into(),
            message: "connection refused".into(),
        }
    }

    #[test]
    fn test_assess_stores_context_and_reports_progress() {
        let generator = Arc::new(ScriptedGenerator::new().reply("Hello. Eat more fiber."));
        let consultation = consultation(&generator, 0.9);
        let start = Session::new().with_exchange("earlier", "reply");

        let mut predicted = None;
        let mut streamed = String::new();
        let (next, assessment) = consultation
            .assess(&start, &features(), &mut |p| match p {
                Progress::Predicted(r) => predicted = Some(r),
                Progress::Chunk(c) => streamed.push_str(c),
            })
            .expect("Should assess");

        assert_eq!(predicted.map(|r| r.status()), Some(DiabetesStatus::Diabetic));
        assert_eq!(streamed, "Hello. Eat more fiber.");
        assert_eq!(assessment.advice, "Hello. Eat more fiber.");

        let ctx = next.context.as_ref().expect("context stored");
        assert_eq!(ctx.advice, "Hello. Eat more fiber.");
        assert_eq!(ctx.features, features());
        assert_eq!(ctx.prediction.label(), 1);
        assert_eq!(next.history, start.history);
    }

    #[test]
    fn test_scenario_failed_advice_stores_nothing() {
        let generator = Arc::new(
            ScriptedGenerator::new()
                .reply("First advice.")
                .fail(outage()),
        );
        let consultation = consultation(&generator, 0.2);

        let (session, _) = consultation
            .assess(&Session::new(), &features(), &mut |_| {})
            .expect("First assessment succeeds");

        let err = consultation
            .assess(&session, &features(), &mut |_| {})
            .expect_err("Second assessment fails");
        assert!(matches!(err, GlycoError::ExternalService(_)));

        // Caller keeps the previous session untouched.
        let ctx = session.context.as_ref().expect("old context kept");
        assert_eq!(ctx.advice, "First advice.");
        assert_eq!(ctx.prediction.status(), DiabetesStatus::NotDiabetic);
    }

    #[test]
    fn test_ask_appends_exchange_and_uses_context() {
        let generator = Arc::new(
            ScriptedGenerator::new()
                .reply("Advice text.")
                .reply("Walking is great."),
        );
        let consultation = consultation(&generator, 0.9);

        let (session, _) = consultation
            .assess(&Session::new(), &features(), &mut |_| {})
            .expect("assess");
        let (session, answer) = consultation
            .ask(&session, QUICK_QUESTIONS[1], &mut |_| {})
            .expect("ask");

        assert_eq!(answer, "Walking is great.");
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].role, Role::User);
        assert_eq!(session.history[0].content, QUICK_QUESTIONS[1]);
        assert_eq!(session.history[1].content, "Walking is great.");

        let system = &generator.requests()[1].messages[0].content;
        assert!(system.contains("Prediction result: Positive (Diabetic)"));
        assert!(system.contains("Previous advice: Advice text."));
    }

    #[test]
    fn test_failed_ask_keeps_history() {
        let generator = Arc::new(ScriptedGenerator::new().fail(outage()));
        let consultation = consultation(&generator, 0.9);
        let session = Session::new().with_exchange("q", "a");

        assert!(consultation.ask(&session, "Another?", &mut |_| {}).is_err());
        assert_eq!(session.history.len(), 2);
    }

    #[test]
    fn test_missing_config_blocks_calls_but_not_prediction() {
        let consultation = Consultation::new(
            Arc::new(Always(0.9)),
            Err(ConfigError::MissingSecret {
                var: "GOOGLE_API_KEY",
            }),
        );
        assert!(consultation.config_error().is_some());
        assert_eq!(consultation.predict(&features()).label(), 1);

        let mut predicted = false;
        let err = consultation
            .assess(&Session::new(), &features(), &mut |p| {
                predicted |= matches!(p, Progress::Predicted(_));
            })
            .expect_err("No advice backend");
        assert!(predicted);
        assert!(matches!(err, GlycoError::Configuration(_)));

        let err = consultation
            .ask(&Session::new(), "When should I see a doctor?", &mut |_| {})
            .expect_err("No advice backend");
        assert!(matches!(err, GlycoError::Configuration(_)));
    }

    #[test]
    fn test_quick_questions() {
        assert_eq!(QUICK_QUESTIONS.len(), 5);
        assert!(QUICK_QUESTIONS.iter().all(|q| q.ends_with('?')));
    }
}
