//! Plain-text presentation of a turn result. Field values stay typed on the
//! cards; everything here only decides how they read on a terminal.

use std::fmt::Write as _;

use crate::domain::card::{Card, CardKind, CardStatus, FieldValue};
use crate::domain::document::{Document, DocumentStatus};
use crate::domain::turn::TurnResult;

pub fn kind_glyph(kind: CardKind) -> &'static str {
    match kind {
        CardKind::Asset => "🏢",
        CardKind::Liquidity => "🎯",
        CardKind::Legal => "⚖️",
        CardKind::Compliance => "✅",
        CardKind::Token => "🪙",
    }
}

pub fn status_label(status: CardStatus) -> &'static str {
    match status {
        CardStatus::Incomplete => "in progress",
        CardStatus::Complete => "complete",
        CardStatus::Verified => "verified",
    }
}

pub fn document_status_label(status: DocumentStatus) -> &'static str {
    match status {
        DocumentStatus::Ready => "Ready for review",
        DocumentStatus::Signed => "Signed",
        DocumentStatus::Draft => "Draft",
    }
}

/// `estimatedValue` -> `Estimated Value`.
pub fn format_field_key(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    for character in key.chars() {
        if character.is_uppercase() {
            spaced.push(' ');
        }
        spaced.push(character);
    }

    let spaced = spaced.trim();
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn format_field_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Flag(true) => "Yes".to_string(),
        FieldValue::Flag(false) => "No".to_string(),
        FieldValue::Number(number) => {
            let rendered = number.to_string();
            match rendered.split_once('.') {
                Some((whole, fraction)) => format!("{}.{}", group_thousands(whole), fraction),
                None => group_thousands(&rendered),
            }
        }
        FieldValue::Text(text) => text.clone(),
    }
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    if !digits.chars().all(|character| character.is_ascii_digit()) {
        return format!("{sign}{digits}");
    }

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, character) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(character);
    }
    format!("{sign}{grouped}")
}

pub fn render_card(card: &Card) -> String {
    let mut out = format!("{} {}", kind_glyph(card.kind), card.title);
    if let Some(ordinal) = card.ordinal {
        let _ = write!(out, " [{ordinal}]");
    }
    let _ = write!(out, " ({})", status_label(card.status));

    for (key, value) in &card.fields {
        let _ = write!(out, "\n   {}: {}", format_field_key(key), format_field_value(value));
    }
    out
}

pub fn render_document(document: &Document) -> String {
    format!(
        "📄 {} ({}, {}) - {}",
        document.name,
        document.format,
        document.size,
        document_status_label(document.status)
    )
}

pub fn render_turn(result: &TurnResult) -> String {
    let mut sections = Vec::new();

    if !result.display_text.is_empty() {
        sections.push(result.display_text.clone());
    }
    for card in &result.cards {
        sections.push(render_card(card));
    }
    if !result.documents.is_empty() {
        sections.push(result.documents.iter().map(render_document).collect::<Vec<_>>().join("\n"));
    }
    if !result.choices.is_empty() {
        let mut block = String::from("Suggested replies:");
        for (index, choice) in result.choices.iter().enumerate() {
            match choice.icon.as_deref() {
                Some(icon) => {
                    let _ = write!(block, "\n  {}. {icon} {}", index + 1, choice.label);
                }
                None => {
                    let _ = write!(block, "\n  {}. {}", index + 1, choice.label);
                }
            }
        }
        sections.push(block);
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::{format_field_key, format_field_value, render_turn};
    use crate::domain::card::FieldValue;
    use crate::markup::extract;

    #[test]
    fn keys_are_split_on_camel_case() {
        assert_eq!(format_field_key("estimatedValue"), "Estimated Value");
        assert_eq!(format_field_key("company"), "Company");
        assert_eq!(format_field_key("tokenToAssetRatio"), "Token To Asset Ratio");
        assert_eq!(format_field_key(""), "");
    }

    #[test]
    fn values_render_by_scalar_type() {
        assert_eq!(format_field_value(&FieldValue::Flag(true)), "Yes");
        assert_eq!(format_field_value(&FieldValue::Flag(false)), "No");
        assert_eq!(format_field_value(&FieldValue::from(1_234_567_u64)), "1,234,567");
        assert_eq!(format_field_value(&FieldValue::from(-4200_i64)), "-4,200");
        assert_eq!(format_field_value(&FieldValue::from(999_u64)), "999");
        assert_eq!(format_field_value(&FieldValue::from("~$50,000")), "~$50,000");
    }

    #[test]
    fn fractional_numbers_group_only_the_whole_part() {
        let value: FieldValue = serde_json::from_str("12500.75").expect("number parses");

        assert_eq!(format_field_value(&value), "12,500.75");
    }

    #[test]
    fn turn_rendering_lists_cards_documents_and_numbered_choices() {
        let result = extract(concat!(
            "Recorded.\n",
            r#"[BLOCK:asset:Asset Details:{"company":"Acme","shares":1500}]"#,
            "\n[DOCS:Token Holder Agreement|PDF|2.1 MB|ready]",
            "\n[BUTTONS:Need cash|cash_need|💰,Diversify|diversification]",
        ));

        let rendered = render_turn(&result);

        assert!(rendered.starts_with("Recorded."));
        assert!(rendered.contains("🏢 Asset Details [1] (in progress)"));
        assert!(rendered.contains("   Shares: 1,500"));
        assert!(rendered.contains("📄 Token Holder Agreement (PDF, 2.1 MB) - Ready for review"));
        assert!(rendered.contains("  1. 💰 Need cash"));
        assert!(rendered.contains("  2. Diversify"));
    }
}
