//! Inline markup carried inside generated reply text.
//!
//! Three token forms are understood:
//!
//! - `[BLOCK:<kind>:<title>:<json-object>]`: a data card. `kind` and `title`
//!   never contain `:` or `]`; the payload is a single-line flat JSON object.
//! - `[BUTTONS:<label>|<value>|<icon>,...]`: suggested replies. Only the
//!   first list in a reply is honored.
//! - `[DOCS:<name>|<format>|<size>|<status>,...]`: document attachments.
//!
//! The encoder functions refuse input the parser could not read back, and the
//! parser turns raw text into typed [`Segment`]s so no markup escapes past
//! [`MarkupParser::extract`].

use std::str::FromStr;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::domain::card::{Card, CardFields, CardKind};
use crate::domain::choice::Choice;
use crate::domain::document::{Document, DocumentStatus};
use crate::domain::turn::TurnResult;
use crate::errors::MarkupError;

const CARD_PREFIX: &str = "[BLOCK:";
const CHOICES_PREFIX: &str = "[BUTTONS:";
const DOCUMENTS_PREFIX: &str = "[DOCS:";

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"\[BLOCK:(?P<kind>[^:\]]+):(?P<title>[^:\]]+):(?P<payload>\{[^}\n]*\})\]",
            r"|\[BUTTONS:(?P<choices>[^\]]+)\]",
            r"|\[DOCS:(?P<documents>[^\]]+)\]",
        ))
        .expect("token pattern is a valid regex literal")
    })
}

/// What happens to a card token whose kind or payload cannot be parsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedCardPolicy {
    /// Leave the raw token in the display text.
    #[default]
    Preserve,
    /// Drop the raw token along with the card.
    Strip,
}

impl MalformedCardPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preserve => "preserve",
            Self::Strip => "strip",
        }
    }
}

impl FromStr for MalformedCardPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "strip" => Ok(Self::Strip),
            other => Err(ConfigError::Validation(format!(
                "unsupported malformed card policy `{other}` (expected preserve|strip)"
            ))),
        }
    }
}

/// A piece of a parsed reply, in source order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Segment {
    Text(String),
    Card(Card),
    Choices(Vec<Choice>),
    Documents(Vec<Document>),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MarkupParser {
    malformed_cards: MalformedCardPolicy,
}

impl MarkupParser {
    pub fn new(malformed_cards: MalformedCardPolicy) -> Self {
        Self { malformed_cards }
    }

    pub fn malformed_card_policy(&self) -> MalformedCardPolicy {
        self.malformed_cards
    }

    pub fn segments(&self, raw: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut cursor = 0;
        let mut next_ordinal = 1_u32;
        let mut choices_seen = false;

        for captures in token_pattern().captures_iter(raw) {
            let Some(token) = captures.get(0) else {
                continue;
            };
            push_text(&mut segments, &raw[cursor..token.start()]);
            cursor = token.end();

            if captures.name("payload").is_some() {
                match parse_card(&captures) {
                    Ok(card) => {
                        segments.push(Segment::Card(card.with_ordinal(next_ordinal)));
                        next_ordinal += 1;
                    }
                    Err(reason) => {
                        warn!(
                            event_name = "markup.card.rejected",
                            policy = self.malformed_cards.as_str(),
                            reason = %reason,
                            "skipping card token that could not be parsed"
                        );
                        if self.malformed_cards == MalformedCardPolicy::Preserve {
                            push_text(&mut segments, token.as_str());
                        }
                    }
                }
            } else if let Some(body) = captures.name("choices") {
                if choices_seen {
                    debug!(
                        event_name = "markup.choices.ignored",
                        "dropping additional choice list; only the first is honored"
                    );
                    continue;
                }
                choices_seen = true;
                segments.push(Segment::Choices(parse_choice_entries(body.as_str())));
            } else if let Some(body) = captures.name("documents") {
                let documents = parse_document_entries(body.as_str());
                if !documents.is_empty() {
                    segments.push(Segment::Documents(documents));
                }
            }
        }

        push_text(&mut segments, &raw[cursor..]);
        segments
    }

    pub fn extract(&self, raw: &str) -> TurnResult {
        let mut display_text = String::with_capacity(raw.len());
        let mut result = TurnResult::default();

        for segment in self.segments(raw) {
            match segment {
                Segment::Text(text) => display_text.push_str(&text),
                Segment::Card(card) => result.cards.push(card),
                Segment::Choices(choices) => result.choices.extend(choices),
                Segment::Documents(documents) => result.documents.extend(documents),
            }
        }

        result.display_text = display_text.trim().to_string();
        debug!(
            event_name = "markup.extracted",
            cards = result.cards.len(),
            choices = result.choices.len(),
            documents = result.documents.len(),
            "reply markup extracted"
        );
        result
    }
}

/// Extracts with the default policy (malformed cards preserved).
pub fn extract(raw: &str) -> TurnResult {
    MarkupParser::default().extract(raw)
}

/// True when `text` still holds something that looks like a token opener.
pub fn contains_markup(text: &str) -> bool {
    [CARD_PREFIX, CHOICES_PREFIX, DOCUMENTS_PREFIX].iter().any(|prefix| text.contains(prefix))
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Text(previous)) = segments.last_mut() {
        previous.push_str(text);
    } else {
        segments.push(Segment::Text(text.to_string()));
    }
}

fn parse_card(captures: &Captures<'_>) -> Result<Card, String> {
    let kind = captures.name("kind").map(|value| value.as_str()).unwrap_or_default();
    let title = captures.name("title").map(|value| value.as_str().trim()).unwrap_or_default();
    let payload = captures.name("payload").map(|value| value.as_str()).unwrap_or_default();

    let kind = kind.parse::<CardKind>().map_err(|error| error.to_string())?;
    if title.is_empty() {
        return Err("card title is empty".to_string());
    }
    let fields = serde_json::from_str::<CardFields>(payload)
        .map_err(|error| format!("payload for `{title}` is not a flat JSON object: {error}"))?;

    Ok(Card::new(kind, title, fields))
}

fn parse_choice_entries(body: &str) -> Vec<Choice> {
    body.split(',')
        .filter_map(|entry| {
            let mut parts = entry.split('|').map(str::trim);
            let label = parts.next().unwrap_or_default();
            let value = parts.next().unwrap_or_default();
            let icon = parts.next().filter(|icon| !icon.is_empty()).map(str::to_string);

            if label.is_empty() || value.is_empty() {
                debug!(event_name = "markup.choice.skipped", entry, "choice entry lacks label or value");
                return None;
            }
            Some(Choice::new(label, value, icon))
        })
        .collect()
}

fn parse_document_entries(body: &str) -> Vec<Document> {
    body.split(',')
        .filter_map(|entry| {
            let parts = entry.split('|').map(str::trim).collect::<Vec<_>>();
            let [name, format, size, status, ..] = parts.as_slice() else {
                debug!(event_name = "markup.document.skipped", entry, "document entry is incomplete");
                return None;
            };
            if name.is_empty() {
                return None;
            }
            match status.parse::<DocumentStatus>() {
                Ok(status) => Some(Document::new(*name, *format, *size, status)),
                Err(error) => {
                    debug!(event_name = "markup.document.skipped", entry, reason = %error, "document entry rejected");
                    None
                }
            }
        })
        .collect()
}

/// Input for one suggested reply in [`encode_choices`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChoiceSpec {
    pub label: String,
    pub value: String,
    pub icon: Option<String>,
}

impl ChoiceSpec {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into(), icon: None }
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Input for one attachment in [`encode_documents`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentSpec {
    pub name: String,
    pub format: String,
    pub size: String,
    pub status: DocumentStatus,
}

impl DocumentSpec {
    pub fn new(
        name: impl Into<String>,
        format: impl Into<String>,
        size: impl Into<String>,
        status: DocumentStatus,
    ) -> Self {
        Self { name: name.into(), format: format.into(), size: size.into(), status }
    }
}

pub fn encode_card(kind: CardKind, title: &str, fields: &CardFields) -> Result<String, MarkupError> {
    let title = require_text("card.title", title)?;
    reject_reserved("card.title", title, &[':', ']', '\n'])?;

    let payload = serde_json::to_string(fields)
        .map_err(|error| MarkupError::PayloadSerialization(error.to_string()))?;
    let inner = &payload[..payload.len().saturating_sub(1)];
    if inner.contains('}') {
        return Err(MarkupError::PayloadClosingBrace(payload));
    }

    Ok(format!("{CARD_PREFIX}{kind}:{title}:{payload}]"))
}

pub fn encode_choices(choices: &[ChoiceSpec]) -> Result<String, MarkupError> {
    if choices.is_empty() {
        return Err(MarkupError::EmptyField { field: "choices" });
    }

    let mut entries = Vec::with_capacity(choices.len());
    for choice in choices {
        let label = require_text("choice.label", &choice.label)?;
        let value = require_text("choice.value", &choice.value)?;
        reject_reserved("choice.label", label, ENTRY_RESERVED)?;
        reject_reserved("choice.value", value, ENTRY_RESERVED)?;

        match choice.icon.as_deref().map(str::trim).filter(|icon| !icon.is_empty()) {
            Some(icon) => {
                reject_reserved("choice.icon", icon, ENTRY_RESERVED)?;
                entries.push(format!("{label}|{value}|{icon}"));
            }
            None => entries.push(format!("{label}|{value}")),
        }
    }

    Ok(format!("{CHOICES_PREFIX}{}]", entries.join(",")))
}

pub fn encode_documents(documents: &[DocumentSpec]) -> Result<String, MarkupError> {
    if documents.is_empty() {
        return Err(MarkupError::EmptyField { field: "documents" });
    }

    let mut entries = Vec::with_capacity(documents.len());
    for document in documents {
        let name = require_text("document.name", &document.name)?;
        reject_reserved("document.name", name, ENTRY_RESERVED)?;
        reject_reserved("document.format", &document.format, ENTRY_RESERVED)?;
        reject_reserved("document.size", &document.size, ENTRY_RESERVED)?;
        entries.push(format!(
            "{name}|{}|{}|{}",
            document.format.trim(),
            document.size.trim(),
            document.status.as_str()
        ));
    }

    Ok(format!("{DOCUMENTS_PREFIX}{}]", entries.join(",")))
}

const ENTRY_RESERVED: &[char] = &[',', '|', ']', '\n'];

fn require_text<'a>(field: &'static str, value: &'a str) -> Result<&'a str, MarkupError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MarkupError::EmptyField { field });
    }
    Ok(trimmed)
}

fn reject_reserved(field: &'static str, value: &str, reserved: &[char]) -> Result<(), MarkupError> {
    match value.chars().find(|character| reserved.contains(character)) {
        Some(character) => {
            Err(MarkupError::ReservedCharacter { field, value: value.to_string(), character })
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        contains_markup, encode_card, encode_choices, encode_documents, extract, ChoiceSpec,
        DocumentSpec, MalformedCardPolicy, MarkupParser, Segment,
    };
    use crate::domain::card::{CardFields, CardKind, CardStatus, FieldValue};
    use crate::domain::document::DocumentStatus;
    use crate::errors::MarkupError;

    #[test]
    fn cards_get_ordinals_in_source_order() {
        let raw = concat!(
            "Intro\n",
            r#"[BLOCK:asset:Asset Details:{"company":"Acme"}]"#,
            "\nmiddle\n",
            r#"[BLOCK:legal:Legal Structure:{"entityType":"Delaware LLC"}]"#,
            "\n",
            r#"[BLOCK:token:Token Design:{"totalSupply":1000}]"#,
        );

        let result = extract(raw);

        let summary = result
            .cards
            .iter()
            .map(|card| (card.kind, card.ordinal))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (CardKind::Asset, Some(1)),
                (CardKind::Legal, Some(2)),
                (CardKind::Token, Some(3)),
            ]
        );
        assert!(result.cards.iter().all(|card| card.status == CardStatus::Incomplete));
        assert_eq!(result.display_text, "Intro\n\nmiddle");
    }

    #[test]
    fn card_fields_keep_order_and_scalar_types() {
        let raw = r#"[BLOCK:asset:Asset Details:{"shares":1500,"company":"Acme","listed":false,"ratio":0.5}]"#;

        let result = extract(raw);
        let card = &result.cards[0];

        assert_eq!(card.fields.keys().collect::<Vec<_>>(), vec!["shares", "company", "listed", "ratio"]);
        assert_eq!(card.field("shares").and_then(FieldValue::as_u64), Some(1500));
        assert_eq!(card.field("listed").and_then(FieldValue::as_bool), Some(false));
        assert!(matches!(card.field("ratio"), Some(FieldValue::Number(_))));
        assert_eq!(result.display_text, "");
    }

    #[test]
    fn malformed_payload_is_skipped_and_left_in_text_by_default() {
        let raw = concat!(
            "Before ",
            r#"[BLOCK:asset:Broken:{"company":"Acme",}]"#,
            " after ",
            r#"[BLOCK:legal:Legal Structure:{"exemption":"Rule 506(b)"}]"#,
        );

        let result = extract(raw);

        assert_eq!(result.cards.len(), 1);
        assert_eq!(result.cards[0].title, "Legal Structure");
        assert_eq!(result.cards[0].ordinal, Some(1));
        assert_eq!(result.display_text, r#"Before [BLOCK:asset:Broken:{"company":"Acme",}] after"#);
    }

    #[test]
    fn strip_policy_removes_malformed_tokens() {
        let parser = MarkupParser::new(MalformedCardPolicy::Strip);
        let raw = r#"Before [BLOCK:asset:Broken:{"company":}] after"#;

        let result = parser.extract(raw);

        assert!(result.cards.is_empty());
        assert_eq!(result.display_text, "Before  after");
        assert!(!contains_markup(&result.display_text));
    }

    #[test]
    fn unknown_kind_and_nested_values_count_as_malformed() {
        let raw = concat!(
            r#"[BLOCK:invoice:Invoice:{"total":10}]"#,
            r#"[BLOCK:asset:Holders:{"holders":["a","b"]}]"#,
            r#"[BLOCK:asset:Nothing:{"value":null}]"#,
        );

        let result = extract(raw);

        assert!(result.cards.is_empty());
        assert!(result.display_text.contains("[BLOCK:invoice:Invoice:"));
        assert!(result.display_text.contains("[BLOCK:asset:Holders:"));
        assert!(result.display_text.contains("[BLOCK:asset:Nothing:"));
    }

    #[test]
    fn choices_parse_label_value_and_optional_icon() {
        let result = extract("[BUTTONS:A|a|🚀,B|b]");

        let parsed = result
            .choices
            .iter()
            .map(|choice| (choice.label.as_str(), choice.value.as_str(), choice.icon.as_deref()))
            .collect::<Vec<_>>();
        assert_eq!(parsed, vec![("A", "a", Some("🚀")), ("B", "b", None)]);
        assert_ne!(result.choices[0].id, result.choices[1].id);
        assert_eq!(result.display_text, "");
    }

    #[test]
    fn choice_entries_are_trimmed_and_incomplete_entries_skipped() {
        let result = extract("Pick one [BUTTONS: Rental | rental_property | 🏠 ,Yes, Later|later|  ]");

        let parsed = result
            .choices
            .iter()
            .map(|choice| (choice.label.as_str(), choice.value.as_str(), choice.icon.as_deref()))
            .collect::<Vec<_>>();
        assert_eq!(parsed, vec![("Rental", "rental_property", Some("🏠")), ("Later", "later", None)]);
        assert_eq!(result.display_text, "Pick one");
    }

    #[test]
    fn only_first_choice_list_is_honored_but_all_are_removed() {
        let result = extract("One [BUTTONS:A|a] two [BUTTONS:B|b] three");

        assert_eq!(result.choices.len(), 1);
        assert_eq!(result.choices[0].value, "a");
        assert_eq!(result.display_text, "One  two  three");
    }

    #[test]
    fn documents_are_collected_in_order() {
        let raw = "Docs:\n[DOCS:Token Holder Agreement|PDF|2.1 MB|ready,LLC Operating Agreement|PDF|1.8 MB|draft,Bad|PDF]";

        let result = extract(raw);

        let names = result.documents.iter().map(|doc| (doc.name.as_str(), doc.status)).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                ("Token Holder Agreement", DocumentStatus::Ready),
                ("LLC Operating Agreement", DocumentStatus::Draft),
            ]
        );
        assert_eq!(result.display_text, "Docs:");
    }

    #[test]
    fn segments_preserve_source_order() {
        let raw = r#"Hi [BLOCK:asset:Asset Details:{"a":1}] there [BUTTONS:A|a]"#;

        let segments = MarkupParser::default().segments(raw);

        assert_eq!(segments.len(), 4);
        assert!(matches!(&segments[0], Segment::Text(text) if text == "Hi "));
        assert!(matches!(&segments[1], Segment::Card(card) if card.title == "Asset Details"));
        assert!(matches!(&segments[2], Segment::Text(text) if text == " there "));
        assert!(matches!(&segments[3], Segment::Choices(choices) if choices.len() == 1));
    }

    #[test]
    fn plain_text_passes_through_trimmed() {
        let result = extract("  just words, no tokens [not a token]  ");

        assert_eq!(result.display_text, "just words, no tokens [not a token]");
        assert!(result.cards.is_empty());
        assert!(result.choices.is_empty());
    }

    #[test]
    fn encoded_tokens_are_read_back() {
        let mut fields = CardFields::new();
        fields.insert("company".to_string(), FieldValue::from("Acme"));
        fields.insert("shares".to_string(), FieldValue::from(2500_u64));
        let card = encode_card(CardKind::Asset, "Asset Details", &fields).expect("card encodes");
        let choices = encode_choices(&[
            ChoiceSpec::new("Need cash", "cash_need").icon("💰"),
            ChoiceSpec::new("Diversify", "diversification"),
        ])
        .expect("choices encode");
        let documents = encode_documents(&[DocumentSpec::new(
            "Token Holder Agreement",
            "PDF",
            "2.1 MB",
            DocumentStatus::Ready,
        )])
        .expect("documents encode");

        let result = extract(&format!("Recorded.\n\n{card}\n\nNext?\n\n{choices}\n{documents}"));

        assert_eq!(result.cards.len(), 1);
        assert_eq!(result.cards[0].fields, fields);
        assert_eq!(result.choices.len(), 2);
        assert_eq!(result.choices[0].icon.as_deref(), Some("💰"));
        assert_eq!(result.documents.len(), 1);
        assert_eq!(result.display_text, "Recorded.\n\n\n\nNext?");
        assert!(!contains_markup(&result.display_text));
    }

    #[test]
    fn encoder_rejects_text_that_would_not_round_trip() {
        let fields = CardFields::new();
        assert_eq!(
            encode_card(CardKind::Asset, "Asset: Details", &fields),
            Err(MarkupError::ReservedCharacter {
                field: "card.title",
                value: "Asset: Details".to_string(),
                character: ':',
            })
        );

        let mut braces = CardFields::new();
        braces.insert("note".to_string(), FieldValue::from("{x}"));
        assert!(matches!(
            encode_card(CardKind::Asset, "Notes", &braces),
            Err(MarkupError::PayloadClosingBrace(_))
        ));

        assert!(matches!(
            encode_choices(&[ChoiceSpec::new("Yes, deploy", "deploy_confirm")]),
            Err(MarkupError::ReservedCharacter { character: ',', .. })
        ));
        assert_eq!(encode_choices(&[]), Err(MarkupError::EmptyField { field: "choices" }));
        assert_eq!(
            encode_choices(&[ChoiceSpec::new("Go", "  ")]),
            Err(MarkupError::EmptyField { field: "choice.value" })
        );
    }

    #[test]
    fn empty_payload_object_yields_card_without_fields() {
        let result = extract("[BLOCK:compliance:Compliance Status:{}]");

        assert_eq!(result.cards.len(), 1);
        assert!(result.cards[0].fields.is_empty());
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert!(matches!("STRIP".parse::<MalformedCardPolicy>(), Ok(MalformedCardPolicy::Strip)));
        assert!("drop".parse::<MalformedCardPolicy>().is_err());
    }
}
