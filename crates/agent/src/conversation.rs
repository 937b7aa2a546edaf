use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokenize_core::{Card, CardId, CardKind, CardStatus, DEFAULT_STEP};
use uuid::Uuid;

pub const GREETING: &str = "Hi! I'm your TokenizeAI assistant. I help turn illiquid assets into tradeable tokens.\n\n\
What brings you here today? Are you looking to:\n\
• Get liquidity from company shares you own\n\
• Make your real estate investment tradeable\n\
• Convert partnership stakes into tokens\n\
• Something else entirely?";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub speaker: Speaker,
    pub content: String,
    pub recorded_at: DateTime<Utc>,
}

/// Caller-owned session state for one chat.
///
/// History and the collected cards are kept for the caller's benefit only;
/// reply selection never reads them. Cards here are session copies, so
/// changing their status leaves earlier turn results untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    id: String,
    initial_step: String,
    current_step: String,
    greeting: bool,
    entries: Vec<ConversationEntry>,
    #[serde(default)]
    cards: Vec<Card>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::with_options(DEFAULT_STEP, true)
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(initial_step: impl Into<String>, greeting: bool) -> Self {
        let initial_step = initial_step.into();
        let mut conversation = Self {
            id: Uuid::new_v4().to_string(),
            current_step: initial_step.clone(),
            initial_step,
            greeting,
            entries: Vec::new(),
            cards: Vec::new(),
        };
        conversation.seed_greeting();
        conversation
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn current_step(&self) -> &str {
        &self.current_step
    }

    pub fn set_current_step(&mut self, step: impl Into<String>) {
        self.current_step = step.into();
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// The opening assistant message, if this session shows one.
    pub fn greeting(&self) -> Option<&str> {
        if !self.greeting {
            return None;
        }
        self.entries
            .first()
            .filter(|entry| entry.speaker == Speaker::Assistant)
            .map(|entry| entry.content.as_str())
    }

    pub fn record_user(&mut self, content: impl Into<String>) {
        self.push(Speaker::User, content.into());
    }

    pub fn record_assistant(&mut self, content: impl Into<String>) {
        self.push(Speaker::Assistant, content.into());
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn record_cards(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.cards.extend(cards);
    }

    /// First collected card of `kind`, in the order cards arrived.
    pub fn card_by_kind(&self, kind: CardKind) -> Option<&Card> {
        self.cards.iter().find(|card| card.kind == kind)
    }

    /// Returns false when no collected card has `id`.
    pub fn set_card_status(&mut self, id: &CardId, status: CardStatus) -> bool {
        match self.cards.iter_mut().find(|card| &card.id == id) {
            Some(card) => {
                card.status = status;
                true
            }
            None => false,
        }
    }

    pub fn completed_cards(&self) -> usize {
        self.cards
            .iter()
            .filter(|card| matches!(card.status, CardStatus::Complete | CardStatus::Verified))
            .count()
    }

    /// Share of collected cards that are complete or verified, rounded half up.
    /// Zero while no card has been collected.
    pub fn completion_percentage(&self) -> u8 {
        let total = self.cards.len();
        if total == 0 {
            return 0;
        }
        let rounded = (self.completed_cards() * 200 + total) / (2 * total);
        u8::try_from(rounded).unwrap_or(100)
    }

    /// Clears history and cards and returns to the initial step. Keeps the session id.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.cards.clear();
        self.current_step = self.initial_step.clone();
        self.seed_greeting();
    }

    fn seed_greeting(&mut self) {
        if self.greeting {
            self.push(Speaker::Assistant, GREETING.to_string());
        }
    }

    fn push(&mut self, speaker: Speaker, content: String) {
        self.entries.push(ConversationEntry { speaker, content, recorded_at: Utc::now() });
    }
}

#[cfg(test)]
mod tests {
    use tokenize_core::{Card, CardFields, CardId, CardKind, CardStatus};

    use super::{Conversation, Speaker, GREETING};

    fn card(kind: CardKind) -> Card {
        Card::new(kind, "Details", CardFields::new())
    }

    #[test]
    fn new_session_opens_with_greeting_at_welcome_step() {
        let conversation = Conversation::new();

        assert_eq!(conversation.current_step(), "welcome");
        assert_eq!(conversation.greeting(), Some(GREETING));
        assert_eq!(conversation.entries().len(), 1);
    }

    #[test]
    fn greeting_can_be_disabled() {
        let conversation = Conversation::with_options("intake", false);

        assert_eq!(conversation.greeting(), None);
        assert!(conversation.entries().is_empty());
        assert_eq!(conversation.current_step(), "intake");
    }

    #[test]
    fn reset_clears_history_and_restores_initial_step() {
        let mut conversation = Conversation::new();
        let id = conversation.id().to_string();
        conversation.record_user("I have shares");
        conversation.record_assistant("raw reply");
        conversation.set_current_step("asset_details");

        conversation.reset();

        assert_eq!(conversation.id(), id);
        assert_eq!(conversation.current_step(), "welcome");
        assert_eq!(conversation.entries().len(), 1);
        assert_eq!(conversation.entries()[0].speaker, Speaker::Assistant);
    }

    #[test]
    fn entries_keep_speaker_order() {
        let mut conversation = Conversation::with_options("welcome", false);
        conversation.record_user("hello");
        conversation.record_assistant("hi");

        let speakers = conversation.entries().iter().map(|entry| entry.speaker).collect::<Vec<_>>();
        assert_eq!(speakers, vec![Speaker::User, Speaker::Assistant]);
        assert!(conversation.entries()[0].recorded_at <= conversation.entries()[1].recorded_at);
    }

    #[test]
    fn collected_cards_drive_completion_percentage() {
        let mut conversation = Conversation::new();
        assert_eq!(conversation.completion_percentage(), 0);

        conversation.record_cards([card(CardKind::Asset), card(CardKind::Liquidity), card(CardKind::Token)]);
        assert_eq!(conversation.completion_percentage(), 0);

        let asset_id = conversation.card_by_kind(CardKind::Asset).map(|card| card.id.clone());
        let token_id = conversation.card_by_kind(CardKind::Token).map(|card| card.id.clone());
        assert!(conversation.set_card_status(&asset_id.expect("asset card"), CardStatus::Complete));
        assert_eq!(conversation.completion_percentage(), 33);

        assert!(conversation.set_card_status(&token_id.expect("token card"), CardStatus::Verified));
        assert_eq!(conversation.completed_cards(), 2);
        assert_eq!(conversation.completion_percentage(), 67);
    }

    #[test]
    fn card_lookup_and_status_updates() {
        let mut conversation = Conversation::new();
        conversation.record_cards([card(CardKind::Legal), card(CardKind::Legal)]);

        let first = conversation.card_by_kind(CardKind::Legal).map(|card| card.id.clone());
        assert_eq!(first.as_ref(), conversation.cards().first().map(|card| &card.id));
        assert!(conversation.card_by_kind(CardKind::Compliance).is_none());
        assert!(!conversation.set_card_status(&CardId::generate(), CardStatus::Complete));
    }

    #[test]
    fn reset_drops_collected_cards() {
        let mut conversation = Conversation::new();
        conversation.record_cards([card(CardKind::Asset)]);

        conversation.reset();

        assert!(conversation.cards().is_empty());
        assert_eq!(conversation.completion_percentage(), 0);
    }
}
