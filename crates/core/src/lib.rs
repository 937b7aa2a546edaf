//! Core types for the TokenizeAI conversation engine: the turn data model,
//! the inline reply markup (encoder and extractor), terminal presentation,
//! configuration and the error taxonomy.

pub mod config;
pub mod domain;
pub mod errors;
pub mod markup;
pub mod present;

pub use domain::card::{Card, CardFields, CardId, CardKind, CardStatus, FieldValue};
pub use domain::choice::{Choice, ChoiceId};
pub use domain::document::{Document, DocumentId, DocumentStatus};
pub use domain::turn::{TurnInput, TurnResult, DEFAULT_STEP};
pub use errors::{ApplicationError, DomainError, MarkupError, TurnFailure, FALLBACK_APOLOGY};
pub use markup::{MalformedCardPolicy, MarkupParser, Segment};
