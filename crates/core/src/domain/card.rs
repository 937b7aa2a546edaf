use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardId(pub String);

impl CardId {
    pub fn generate() -> Self {
        Self(format!("card_{}", Uuid::new_v4().simple()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Asset,
    Liquidity,
    Legal,
    Compliance,
    Token,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liquidity => "liquidity",
            Self::Legal => "legal",
            Self::Compliance => "compliance",
            Self::Token => "token",
        }
    }
}

impl FromStr for CardKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "asset" => Ok(Self::Asset),
            "liquidity" => Ok(Self::Liquidity),
            "legal" => Ok(Self::Legal),
            "compliance" => Ok(Self::Compliance),
            "token" => Ok(Self::Token),
            other => Err(DomainError::UnknownCardKind(other.to_string())),
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    #[default]
    Incomplete,
    Complete,
    Verified,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::Complete => "complete",
            Self::Verified => "verified",
        }
    }
}

impl FromStr for CardStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "incomplete" => Ok(Self::Incomplete),
            "complete" => Ok(Self::Complete),
            "verified" => Ok(Self::Verified),
            other => Err(DomainError::UnknownCardStatus(other.to_string())),
        }
    }
}

/// Scalar payload value. Numbers keep their JSON representation so `1000` and
/// `1.5` survive parsing untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(number) => number.as_u64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

pub type CardFields = IndexMap<String, FieldValue>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub kind: CardKind,
    pub title: String,
    pub fields: CardFields,
    pub status: CardStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<u32>,
}

impl Card {
    pub fn new(kind: CardKind, title: impl Into<String>, fields: CardFields) -> Self {
        Self {
            id: CardId::generate(),
            kind,
            title: title.into(),
            fields,
            status: CardStatus::default(),
            ordinal: None,
        }
    }

    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{Card, CardFields, CardKind, CardStatus, FieldValue};
    use crate::errors::DomainError;

    #[test]
    fn kind_parses_every_known_label() {
        for kind in
            [CardKind::Asset, CardKind::Liquidity, CardKind::Legal, CardKind::Compliance, CardKind::Token]
        {
            assert_eq!(kind.as_str().parse::<CardKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert_eq!(
            "invoice".parse::<CardKind>(),
            Err(DomainError::UnknownCardKind("invoice".to_string()))
        );
    }

    #[test]
    fn new_card_defaults_to_incomplete_without_ordinal() {
        let card = Card::new(CardKind::Asset, "Asset Details", CardFields::new());

        assert_eq!(card.status, CardStatus::Incomplete);
        assert_eq!(card.ordinal, None);
        assert!(card.id.0.starts_with("card_"));
    }

    #[test]
    fn generated_ids_are_unique() {
        let first = Card::new(CardKind::Token, "Token Design", CardFields::new());
        let second = Card::new(CardKind::Token, "Token Design", CardFields::new());

        assert_ne!(first.id, second.id);
    }

    #[test]
    fn field_values_keep_their_scalar_type() {
        let fields: CardFields =
            serde_json::from_str(r#"{"company":"Acme","shares":1500,"accredited":true}"#)
                .expect("payload should deserialize");

        assert_eq!(fields["company"], FieldValue::from("Acme"));
        assert_eq!(fields["shares"].as_u64(), Some(1500));
        assert_eq!(fields["accredited"].as_bool(), Some(true));
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["company", "shares", "accredited"]);
    }

    #[test]
    fn nested_values_are_not_scalars() {
        let result = serde_json::from_str::<CardFields>(r#"{"holders":["a","b"]}"#);

        assert!(result.is_err());
    }
}
