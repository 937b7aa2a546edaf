use serde::{Deserialize, Serialize};

use crate::domain::card::Card;
use crate::domain::choice::Choice;
use crate::domain::document::Document;
use crate::errors::{DomainError, FALLBACK_APOLOGY};

pub const DEFAULT_STEP: &str = "welcome";

/// One user utterance plus the coarse conversation step it was sent in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTurnInput")]
pub struct TurnInput {
    text: String,
    current_step: String,
}

#[derive(Deserialize)]
struct RawTurnInput {
    text: String,
    #[serde(default)]
    current_step: String,
}

impl TryFrom<RawTurnInput> for TurnInput {
    type Error = DomainError;

    fn try_from(raw: RawTurnInput) -> Result<Self, Self::Error> {
        Self::new(raw.text, raw.current_step)
    }
}

impl TurnInput {
    pub fn new(text: impl Into<String>, current_step: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DomainError::EmptyUtterance);
        }

        let current_step = current_step.into();
        let current_step =
            if current_step.trim().is_empty() { DEFAULT_STEP.to_string() } else { current_step };

        Ok(Self { text, current_step })
    }

    pub fn welcome(text: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(text, DEFAULT_STEP)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn current_step(&self) -> &str {
        &self.current_step
    }

    pub fn normalized_text(&self) -> String {
        self.text.to_lowercase()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub display_text: String,
    pub cards: Vec<Card>,
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<Document>,
}

impl TurnResult {
    pub fn fallback() -> Self {
        Self { display_text: FALLBACK_APOLOGY.to_string(), ..Self::default() }
    }

    pub fn is_fallback(&self) -> bool {
        self.display_text == FALLBACK_APOLOGY
            && self.cards.is_empty()
            && self.choices.is_empty()
            && self.documents.is_empty()
    }

    pub fn choice_by_position(&self, position: usize) -> Option<&Choice> {
        position.checked_sub(1).and_then(|index| self.choices.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::{TurnInput, TurnResult, DEFAULT_STEP};
    use crate::domain::choice::Choice;
    use crate::errors::{DomainError, FALLBACK_APOLOGY};

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(TurnInput::welcome("   \n"), Err(DomainError::EmptyUtterance));
    }

    #[test]
    fn blank_step_falls_back_to_welcome() {
        let input = TurnInput::new("hello", "  ").expect("valid input");

        assert_eq!(input.current_step(), DEFAULT_STEP);
        assert_eq!(input.text(), "hello");
    }

    #[test]
    fn fallback_result_is_recognizable() {
        let result = TurnResult::fallback();

        assert_eq!(result.display_text, FALLBACK_APOLOGY);
        assert!(result.is_fallback());
    }

    #[test]
    fn choices_are_addressed_from_one() {
        let result = TurnResult {
            choices: vec![Choice::new("A", "a", None), Choice::new("B", "b", None)],
            ..TurnResult::default()
        };

        assert_eq!(result.choice_by_position(0), None);
        assert_eq!(result.choice_by_position(2).map(|choice| choice.value.as_str()), Some("b"));
        assert_eq!(result.choice_by_position(3), None);
    }

    #[test]
    fn deserialized_input_is_validated_like_new() {
        let blank = serde_json::from_str::<TurnInput>(r#"{"text":"   ","current_step":"intake"}"#);
        let stepless = serde_json::from_str::<TurnInput>(r#"{"text":"I own shares"}"#)
            .expect("text-only input deserializes");

        let error = blank.expect_err("blank text is rejected");
        assert!(error.to_string().contains("must not be empty"));
        assert_eq!(stepless.current_step(), DEFAULT_STEP);
        assert_eq!(stepless.text(), "I own shares");
    }
}
