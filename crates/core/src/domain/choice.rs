use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChoiceId(pub String);

impl ChoiceId {
    pub fn generate() -> Self {
        Self(format!("choice_{}", Uuid::new_v4().simple()))
    }
}

/// A suggested reply. `value` is opaque and is meant to be sent back verbatim
/// as the next turn's text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: ChoiceId,
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>, icon: Option<String>) -> Self {
        Self { id: ChoiceId::generate(), label: label.into(), value: value.into(), icon }
    }
}
