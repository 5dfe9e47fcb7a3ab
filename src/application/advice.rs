//! Advice service: prompt composition for initial advice and follow-ups.
//!
//! Prompt builders are pure; [`AdviceService`] only adds the single call to
//! the text generator. Nothing here retries.

use std::sync::Arc;

use crate::domain::{
    yes_no_label, AdviceContext, ChatMessage, DiabetesStatus, FeatureVector,
};
use crate::ports::{GenerationRequest, TextGenerator};
use crate::GlycoError;

pub const ADVICE_TEMPERATURE: f32 = 0.65;
pub const ADVICE_MAX_TOKENS: u32 = 650;
pub const FOLLOWUP_TEMPERATURE: f32 = 0.75;
pub const FOLLOWUP_MAX_TOKENS: u32 = 950;

pub const NO_PREDICTION: &str = "No prediction yet";
pub const NO_ADVICE: &str = "No previous advice given";
pub const NO_PROFILE: &str = "No detailed information available";

const ADVISOR_PERSONA: &str = "You are a warm, professional, realistic and concise health advisor.
You speak directly to the patient using \"you\".
Be empathetic but straightforward. Never give false hope or dangerous advice.";

const ASSISTANT_PERSONA: &str =
    "You are a knowledgeable, kind diabetes & general health assistant.";

/// Messages asking for first advice on a prediction.
#[must_use]
pub fn initial_advice_request(features: &FeatureVector, status: DiabetesStatus) -> GenerationRequest {
    let user = format!(
        "Patient profile:
- Gender:          {gender}
- Age:             {age} years
- Hypertension:    {hypertension}
- Heart disease:   {heart_disease}
- Smoking history: {smoking}
- BMI:             {bmi}
- HbA1c:           {hba1c}
- Blood glucose:   {glucose} mg/dL

Current prediction result: The person is **{status}**.

Please provide personalized recommendations in this structure:

1. Warm, personal greeting
2. Dietary advice (foods and fruits to prefer / limit / avoid)
3. Lifestyle & physical activity recommendations
4. Recommendation about seeing a doctor (including suggested urgency)

Use bullet points where appropriate. Keep the total response concise.",
        gender = features.gender().label(),
        age = features.age(),
        hypertension = yes_no_label(features.hypertension()),
        heart_disease = yes_no_label(features.heart_disease()),
        smoking = features.smoking_history().label(),
        bmi = features.bmi(),
        hba1c = features.hba1c(),
        glucose = features.blood_glucose(),
        status = status.prompt_label(),
    );

    GenerationRequest {
        messages: vec![ChatMessage::system(ADVISOR_PERSONA), ChatMessage::user(user)],
        temperature: ADVICE_TEMPERATURE,
        max_tokens: ADVICE_MAX_TOKENS,
    }
}

/// Context block for follow-up questions, with placeholders when no
/// assessment has been made yet.
#[must_use]
pub fn context_block(context: Option<&AdviceContext>) -> String {
    let (result, advice, profile) = match context {
        Some(ctx) => (
            ctx.prediction.status().description().to_string(),
            ctx.advice.clone(),
            ctx.user_profile(),
        ),
        None => (
            NO_PREDICTION.to_string(),
            NO_ADVICE.to_string(),
            NO_PROFILE.to_string(),
        ),
    };

    format!(
        "Current context:
Prediction result: {result}
Previous advice: {advice}
User profile: {profile}

Answer naturally, be helpful, empathetic and realistic.
Use the context when relevant. Keep answers clear and reasonably concise."
    )
}

/// Messages for one follow-up question.
#[must_use]
pub fn followup_request(context: Option<&AdviceContext>, question: &str) -> GenerationRequest {
    let system = format!("{}\n\n{ASSISTANT_PERSONA}", context_block(context));
    GenerationRequest {
        messages: vec![ChatMessage::system(system), ChatMessage::user(question.trim())],
        temperature: FOLLOWUP_TEMPERATURE,
        max_tokens: FOLLOWUP_MAX_TOKENS,
    }
}

/// Service generating advice text through a [`TextGenerator`].
#[derive(Clone)]
pub struct AdviceService {
    generator: Arc<dyn TextGenerator>,
}

impl AdviceService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        self.generator.provider()
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.generator.model()
    }

    /// Advice for a fresh prediction, streamed through `on_chunk`.
    ///
    /// # Errors
    /// Returns `GlycoError::ExternalService` if the service call fails or
    /// yields no text.
    pub fn generate_initial_advice(
        &self,
        features: &FeatureVector,
        status: DiabetesStatus,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<String, GlycoError> {
        tracing::info!(
            "Requesting initial advice from {} ({})",
            self.provider(),
            self.model()
        );
        let request = initial_advice_request(features, status);
        let text = self.generator.generate(&request, on_chunk)?;
        Ok(text.trim().to_string())
    }

    /// Answer a follow-up question grounded on the last assessment.
    ///
    /// # Errors
    /// Returns `GlycoError::EmptyQuestion` for a blank question (no call is
    /// made) and `GlycoError::ExternalService` if the service call fails.
    pub fn generate_followup_answer(
        &self,
        context: Option<&AdviceContext>,
        question: &str,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<String, GlycoError> {
        if question.trim().is_empty() {
            return Err(GlycoError::EmptyQuestion);
        }
        tracing::info!(
            "Requesting follow-up answer from {} (context: {})",
            self.provider(),
            if context.is_some() { "yes" } else { "none" }
        );
        let request = followup_request(context, question);
        let text = self.generator.generate(&request, on_chunk)?;
        Ok(text.trim().to_string())
    }
}
