use thiserror::Error;

/// Reply shown to the user whenever a turn cannot be produced.
pub const FALLBACK_APOLOGY: &str = "I apologize, but I'm having trouble processing your request right now. Please try again in a moment.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("turn input text must not be empty")]
    EmptyUtterance,
    #[error("unknown card kind `{0}` (expected asset|liquidity|legal|compliance|token)")]
    UnknownCardKind(String),
    #[error("unknown card status `{0}` (expected incomplete|complete|verified)")]
    UnknownCardStatus(String),
    #[error("unknown document status `{0}` (expected draft|ready|signed)")]
    UnknownDocumentStatus(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("{field} `{value}` contains reserved character `{character}`")]
    ReservedCharacter { field: &'static str, value: String, character: char },
    #[error("card payload could not be serialized: {0}")]
    PayloadSerialization(String),
    #[error("card payload `{0}` contains a closing brace inside a value")]
    PayloadClosingBrace(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Markup(#[from] MarkupError),
    #[error("response generation failed: {0}")]
    Generation(String),
    #[error("response generation exceeded deadline of {after_ms}ms")]
    DeadlineExceeded { after_ms: u64 },
    #[error("response generator panicked: {0}")]
    GeneratorPanicked(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// Failure of a whole turn as seen by the conversational surface.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnFailure {
    #[error("invalid turn: {message}")]
    InvalidTurn { message: String, correlation_id: String },
    #[error("generation unavailable: {message}")]
    GenerationUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl TurnFailure {
    /// Every failure class collapses to the same apology so the chat never shows a raw error.
    pub fn user_message(&self) -> &'static str {
        FALLBACK_APOLOGY
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::InvalidTurn { correlation_id, .. }
            | Self::GenerationUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::InvalidTurn { .. } => "invalid_turn",
            Self::GenerationUnavailable { .. } => "generation_unavailable",
            Self::Internal { .. } => "internal",
        }
    }
}

impl ApplicationError {
    pub fn into_turn_failure(self, correlation_id: impl Into<String>) -> TurnFailure {
        let correlation_id = correlation_id.into();
        let mut mapped = TurnFailure::from(self);
        match &mut mapped {
            TurnFailure::InvalidTurn { correlation_id: id, .. }
            | TurnFailure::GenerationUnavailable { correlation_id: id, .. }
            | TurnFailure::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for TurnFailure {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => {
                Self::InvalidTurn { message: error.to_string(), correlation_id: "unassigned".to_owned() }
            }
            error @ (ApplicationError::Generation(_) | ApplicationError::DeadlineExceeded { .. }) => {
                Self::GenerationUnavailable {
                    message: error.to_string(),
                    correlation_id: "unassigned".to_owned(),
                }
            }
            error @ (ApplicationError::Markup(_)
            | ApplicationError::Configuration(_)
            | ApplicationError::GeneratorPanicked(_)) => {
                Self::Internal { message: error.to_string(), correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
