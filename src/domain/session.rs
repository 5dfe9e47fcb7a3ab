//! Per-user consultation state.
//!
//! A [`Session`] is owned by the hosting layer and threaded through every
//! handler; handlers return a new session instead of mutating shared state.

use serde::{Deserialize, Serialize};

use super::diagnosis::PredictionResult;
use super::patient::FeatureVector;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The last prediction, its input and the advice generated for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceContext {
    pub prediction: PredictionResult,
    pub features: FeatureVector,
    pub advice: String,
}

impl AdviceContext {
    /// One-line profile, e.g. `Gender: Male, Age: 45, ...`.
    #[must_use]
    pub fn user_profile(&self) -> String {
        self.features
            .describe()
            .into_iter()
            .map(|(field, value)| format!("{field}: {value}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Consultation state carried across interactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub context: Option<AdviceContext>,
    pub history: Vec<ChatMessage>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with a new advice context; chat history is kept.
    #[must_use]
    pub fn with_context(&self, context: AdviceContext) -> Self {
        Self {
            context: Some(context),
            history: self.history.clone(),
        }
    }

    /// Session with one question/answer exchange appended.
    #[must_use]
    pub fn with_exchange(&self, question: &str, answer: &str) -> Self {
        let mut history = self.history.clone();
        history.push(ChatMessage::user(question));
        history.push(ChatMessage::assistant(answer));
        Self {
            context: self.context.clone(),
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureInput, PredictionResult};

    fn context() -> AdviceContext {
        let features = FeatureInput {
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
        .expect("Should parse");

        AdviceContext {
            prediction: PredictionResult::from_probability(0.9),
            features,
            advice: "Eat more vegetables.".into(),
        }
    }

    #[test]
    fn test_user_profile() {
        let profile = context().user_profile();
        assert_eq!(
            profile,
            "Gender: Male, Age: 45, Hypertension: Yes, Heart disease: No, \
             Smoking history: Never, BMI: 31.2, HbA1c: 6.8, Blood glucose: 160"
        );
    }

    #[test]
    fn test_transitions_leave_original_untouched() {
        let start = Session::new();
        let assessed = start.with_context(context());
        let chatted = assessed.with_exchange("Can I exercise?", "Yes.");

        assert!(start.context.is_none());
        assert!(assessed.history.is_empty());
        assert_eq!(chatted.history.len(), 2);
        assert_eq!(chatted.history[0].role, Role::User);
        assert_eq!(chatted.history[1].role, Role::Assistant);
        assert_eq!(chatted.context, assessed.context);
    }

    #[test]
    fn test_new_context_replaces_old_and_keeps_history() {
        let first = Session::new()
            .with_context(context())
            .with_exchange("q", "a");
        let mut replacement = context();
        replacement.advice = "New advice".into();

        let second = first.with_context(replacement);
        assert_eq!(second.context.as_ref().map(|c| c.advice.as_str()), Some("New advice"));
        assert_eq!(second.history, first.history);
    }
}
