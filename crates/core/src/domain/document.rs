use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn generate() -> Self {
        Self(format!("doc_{}", Uuid::new_v4().simple()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Ready,
    Signed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Signed => "signed",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "ready" => Ok(Self::Ready),
            "signed" => Ok(Self::Signed),
            other => Err(DomainError::UnknownDocumentStatus(other.to_string())),
        }
    }
}

/// A generated document attached to a reply (agreements, filings).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    pub format: String,
    pub size: String,
    pub status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Document {
    pub fn new(
        name: impl Into<String>,
        format: impl Into<String>,
        size: impl Into<String>,
        status: DocumentStatus,
    ) -> Self {
        Self {
            id: DocumentId::generate(),
            name: name.into(),
            format: format.into(),
            size: size.into(),
            status,
            url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentStatus;
    use crate::errors::DomainError;

    #[test]
    fn status_parsing_ignores_case_and_padding() {
        assert_eq!(" Ready ".parse::<DocumentStatus>(), Ok(DocumentStatus::Ready));
        assert_eq!("SIGNED".parse::<DocumentStatus>(), Ok(DocumentStatus::Signed));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(
            "executed".parse::<DocumentStatus>(),
            Err(DomainError::UnknownDocumentStatus("executed".to_string()))
        );
    }
}
