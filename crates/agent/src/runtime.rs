use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;

use tokenize_core::config::AppConfig;
use tokenize_core::{ApplicationError, MarkupParser, TurnInput, TurnResult};
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversation::Conversation;
use crate::llm::ResponseGenerator;
use crate::responder::KeywordResponder;

/// Runs one conversational turn: generate raw reply text, then pull the
/// markup out of it. Callers always get a displayable result.
pub struct AgentRuntime<G = KeywordResponder> {
    generator: G,
    parser: MarkupParser,
    deadline: Option<Duration>,
}

impl Default for AgentRuntime<KeywordResponder> {
    fn default() -> Self {
        Self::new(KeywordResponder::default())
    }
}

impl AgentRuntime<KeywordResponder> {
    pub fn from_config(config: &AppConfig) -> Self {
        let responder = KeywordResponder::default()
            .with_simulated_latency(Duration::from_millis(config.responder.simulated_latency_ms));
        let deadline = (config.responder.timeout_ms > 0)
            .then(|| Duration::from_millis(config.responder.timeout_ms));

        Self::new(responder)
            .with_parser(MarkupParser::new(config.markup.malformed_cards))
            .with_deadline(deadline)
    }
}

impl<G> AgentRuntime<G>
where
    G: ResponseGenerator,
{
    pub fn new(generator: G) -> Self {
        Self { generator, parser: MarkupParser::default(), deadline: None }
    }

    pub fn with_parser(mut self, parser: MarkupParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Generates and extracts, returning the raw reply alongside the result.
    pub async fn try_turn(&self, input: &TurnInput) -> Result<(String, TurnResult), ApplicationError> {
        let raw = self.generate(input).await?;
        let result = self.parser.extract(&raw);
        Ok((raw, result))
    }

    pub async fn handle_turn(&self, input: &TurnInput) -> TurnResult {
        let correlation_id = new_correlation_id();
        self.run_turn(input, &correlation_id)
            .await
            .map(|(_, result)| result)
            .unwrap_or_else(TurnResult::fallback)
    }

    /// Runs a turn for `text` inside `session`, recording both sides of the
    /// exchange and collecting the reply's cards.
    pub async fn handle_session_turn(&self, session: &mut Conversation, text: &str) -> TurnResult {
        let correlation_id = new_correlation_id();
        let input = match TurnInput::new(text, session.current_step()) {
            Ok(input) => input,
            Err(error) => {
                let failure = ApplicationError::from(error).into_turn_failure(&correlation_id);
                warn!(
                    event_name = "agent.turn.failed",
                    correlation_id = %correlation_id,
                    session_id = session.id(),
                    error_class = failure.error_class(),
                    error = %failure,
                    "turn rejected before generation"
                );
                return TurnResult::fallback();
            }
        };

        session.record_user(input.text());
        match self.run_turn(&input, &correlation_id).await {
            Some((raw, result)) => {
                session.record_assistant(raw);
                session.record_cards(result.cards.iter().cloned());
                result
            }
            None => {
                let result = TurnResult::fallback();
                session.record_assistant(result.display_text.clone());
                result
            }
        }
    }

    pub fn reset(&self, session: &mut Conversation) {
        session.reset();
        info!(
            event_name = "agent.session.reset",
            session_id = session.id(),
            "conversation history cleared"
        );
    }

    async fn run_turn(&self, input: &TurnInput, correlation_id: &str) -> Option<(String, TurnResult)> {
        let started = Instant::now();
        info!(
            event_name = "agent.turn.started",
            correlation_id,
            current_step = input.current_step(),
            "turn started"
        );

        match self.try_turn(input).await {
            Ok((raw, result)) => {
                info!(
                    event_name = "agent.turn.completed",
                    correlation_id,
                    cards = result.cards.len(),
                    choices = result.choices.len(),
                    documents = result.documents.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "turn completed"
                );
                Some((raw, result))
            }
            Err(error) => {
                let failure = error.into_turn_failure(correlation_id);
                warn!(
                    event_name = "agent.turn.failed",
                    correlation_id,
                    error_class = failure.error_class(),
                    error = %failure,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "turn failed; returning fallback reply"
                );
                None
            }
        }
    }

    async fn generate(&self, input: &TurnInput) -> Result<String, ApplicationError> {
        let generation = AssertUnwindSafe(self.generator.generate(input)).catch_unwind();
        let outcome = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, generation).await.map_err(|_| {
                ApplicationError::DeadlineExceeded { after_ms: deadline.as_millis() as u64 }
            })?,
            None => generation.await,
        };

        outcome
            .map_err(|payload| ApplicationError::GeneratorPanicked(panic_message(payload.as_ref())))?
            .map_err(|error| ApplicationError::Generation(format!("{error:#}")))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

fn new_correlation_id() -> String {
    format!("turn-{}", Uuid::new_v4().simple())
}
