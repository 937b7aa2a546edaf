use std::io;

use tokenize_agent::{AgentRuntime, Conversation, ResponseGenerator};
use tokenize_core::config::LoadOptions;
use tokenize_core::{present, CardStatus, TurnResult};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

use crate::commands::{current_thread_runtime, load_config, CommandResult, EXIT_RUNTIME};

const COMMAND: &str = "chat";
const PROMPT: &str = "you> ";
const HELP: &str = "Type a message, or the number of a suggested reply. \
Commands: /cards lists collected cards, /complete <n> marks card n complete, \
/reset starts over, /help shows this, /quit exits.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub turns: usize,
    pub resets: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum ChatCommand {
    Skip,
    Quit,
    Reset,
    Help,
    Cards,
    Complete(usize),
    Say { text: String, echoed_label: Option<String> },
}

impl ChatCommand {
    fn parse(line: &str, last: Option<&TurnResult>) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "" => return Self::Skip,
            "/quit" | "/exit" => return Self::Quit,
            "/reset" => return Self::Reset,
            "/help" => return Self::Help,
            "/cards" => return Self::Cards,
            _ => {}
        }

        if let Some(argument) = trimmed.strip_prefix("/complete") {
            return match argument.trim().parse::<usize>() {
                Ok(position) if position > 0 => Self::Complete(position),
                _ => Self::Help,
            };
        }

        let selected = trimmed
            .parse::<usize>()
            .ok()
            .and_then(|position| last.and_then(|result| result.choice_by_position(position)));
        match selected {
            Some(choice) => {
                Self::Say { text: choice.value.clone(), echoed_label: Some(choice.label.clone()) }
            }
            None => Self::Say { text: trimmed.to_string(), echoed_label: None },
        }
    }
}

/// Interactive session over stdin/stdout.
pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match current_thread_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let agent = AgentRuntime::from_config(&config);
    let mut session =
        Conversation::with_options(config.session.initial_step.clone(), config.session.greeting);

    let outcome = runtime.block_on(async {
        let reader = BufReader::new(tokio::io::stdin());
        let mut writer = tokio::io::stdout();
        run_session(&agent, &mut session, reader, &mut writer).await
    });

    match outcome {
        Ok(summary) => CommandResult::plain(format!(
            "session {} closed after {} turn(s), {} reset(s)",
            session.id(),
            summary.turns,
            summary.resets
        )),
        Err(error) => CommandResult::failure(COMMAND, "io", error.to_string(), EXIT_RUNTIME),
    }
}

/// Drives a conversation until the reader is exhausted or the user quits.
///
/// Typing the number of a suggested reply from the previous turn sends that
/// reply's value as the next message.
pub async fn run_session<G, R, W>(
    agent: &AgentRuntime<G>,
    session: &mut Conversation,
    reader: R,
    writer: &mut W,
) -> io::Result<SessionSummary>
where
    G: ResponseGenerator,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = SessionSummary::default();
    let mut last: Option<TurnResult> = None;
    let mut lines = reader.lines();

    write_greeting(session, writer).await?;
    write_block(writer, HELP).await?;

    loop {
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ChatCommand::parse(&line, last.as_ref()) {
            ChatCommand::Skip => continue,
            ChatCommand::Quit => break,
            ChatCommand::Help => write_block(writer, HELP).await?,
            ChatCommand::Reset => {
                agent.reset(session);
                last = None;
                summary.resets += 1;
                write_block(writer, "Conversation cleared.").await?;
                write_greeting(session, writer).await?;
            }
            ChatCommand::Cards => write_block(writer, &render_cards(session)).await?,
            ChatCommand::Complete(position) => {
                let card_id = session.cards().get(position - 1).map(|card| card.id.clone());
                let message = match card_id {
                    Some(id) if session.set_card_status(&id, CardStatus::Complete) => {
                        render_progress(session)
                    }
                    _ => format!("No collected card #{position}."),
                };
                write_block(writer, &message).await?;
            }
            ChatCommand::Say { text, echoed_label } => {
                if let Some(label) = echoed_label {
                    write_block(writer, &format!("you> {label}")).await?;
                }
                let result = agent.handle_session_turn(session, &text).await;
                summary.turns += 1;
                write_block(writer, &present::render_turn(&result)).await?;
                if !result.cards.is_empty() {
                    write_block(writer, &render_progress(session)).await?;
                }
                last = Some(result);
            }
        }
    }

    writer.flush().await?;
    info!(
        event_name = "cli.chat.closed",
        session_id = session.id(),
        turns = summary.turns,
        resets = summary.resets,
        "chat session closed"
    );
    Ok(summary)
}

fn render_progress(session: &Conversation) -> String {
    format!(
        "Progress: {}% complete ({} of {} cards)",
        session.completion_percentage(),
        session.completed_cards(),
        session.cards().len()
    )
}

fn render_cards(session: &Conversation) -> String {
    if session.cards().is_empty() {
        return "No cards collected yet.".to_string();
    }
    let mut lines = session
        .cards()
        .iter()
        .enumerate()
        .map(|(index, card)| {
            format!(
                "  {}. {} {} ({})",
                index + 1,
                present::kind_glyph(card.kind),
                card.title,
                present::status_label(card.status)
            )
        })
        .collect::<Vec<_>>();
    lines.push(render_progress(session));
    lines.join("\n")
}

async fn write_greeting<W>(session: &Conversation, writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match session.greeting() {
        Some(greeting) => write_block(writer, greeting).await,
        None => Ok(()),
    }
}

async fn write_block<W>(writer: &mut W, block: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(block.as_bytes()).await?;
    writer.write_all(b"\n\n").await
}

#[cfg(test)]
mod tests {
    use tokenize_agent::{AgentRuntime, Conversation, KeywordResponder, Speaker};
    use tokenize_core::{CardStatus, Choice, TurnResult};

    use super::{run_session, ChatCommand};

    fn result_with_choices() -> TurnResult {
        TurnResult {
            choices: vec![
                Choice::new("Company shares", "company_shares", Some("📈".to_string())),
                Choice::new("Real estate", "real_estate", None),
            ],
            ..TurnResult::default()
        }
    }

    #[test]
    fn numbered_input_replays_choice_value() {
        let last = result_with_choices();

        assert_eq!(
            ChatCommand::parse("2", Some(&last)),
            ChatCommand::Say {
                text: "real_estate".to_string(),
                echoed_label: Some("Real estate".to_string())
            }
        );
    }

    #[test]
    fn out_of_range_number_is_sent_as_text() {
        let last = result_with_choices();

        assert_eq!(
            ChatCommand::parse(" 7 ", Some(&last)),
            ChatCommand::Say { text: "7".to_string(), echoed_label: None }
        );
        assert_eq!(
            ChatCommand::parse("1", None),
            ChatCommand::Say { text: "1".to_string(), echoed_label: None }
        );
    }

    #[test]
    fn slash_commands_and_blank_lines() {
        assert_eq!(ChatCommand::parse("   ", None), ChatCommand::Skip);
        assert_eq!(ChatCommand::parse("/quit", None), ChatCommand::Quit);
        assert_eq!(ChatCommand::parse("/exit", None), ChatCommand::Quit);
        assert_eq!(ChatCommand::parse("/reset", None), ChatCommand::Reset);
        assert_eq!(ChatCommand::parse("/help", None), ChatCommand::Help);
        assert_eq!(ChatCommand::parse("/cards", None), ChatCommand::Cards);
        assert_eq!(ChatCommand::parse("/complete 2", None), ChatCommand::Complete(2));
        assert_eq!(ChatCommand::parse("/complete zero", None), ChatCommand::Help);
        assert_eq!(ChatCommand::parse("/complete 0", None), ChatCommand::Help);
    }

    #[tokio::test]
    async fn session_reports_card_progress() {
        let agent = AgentRuntime::new(KeywordResponder::default());
        let mut session = Conversation::with_options("welcome", false);
        let mut output = Vec::new();

        run_session(
            &agent,
            &mut session,
            &b"Acme is a startup\nI need cash\n/complete 1\n/complete 9\n/cards\n"[..],
            &mut output,
        )
        .await
        .expect("in-memory session should not fail");

        let transcript = String::from_utf8(output).expect("transcript is utf-8");
        assert!(transcript.contains("Progress: 0% complete (0 of 1 cards)"));
        assert!(transcript.contains("Progress: 0% complete (0 of 2 cards)"));
        assert!(transcript.contains("Progress: 50% complete (1 of 2 cards)"));
        assert!(transcript.contains("No collected card #9."));
        assert_eq!(session.cards()[0].status, CardStatus::Complete);
        assert_eq!(session.completion_percentage(), 50);
    }

    #[tokio::test]
    async fn session_replays_selected_choice_and_records_history() {
        let agent = AgentRuntime::new(KeywordResponder::default());
        let mut session = Conversation::new();
        let mut output = Vec::new();

        let summary =
            run_session(&agent, &mut session, &b"hello\n1\n/quit\n"[..], &mut output)
                .await
                .expect("in-memory session should not fail");

        assert_eq!(summary.turns, 2);
        let transcript = String::from_utf8(output).expect("transcript is utf-8");
        assert!(transcript.contains("Suggested replies:"));
        assert!(transcript.contains("you> Company shares"));

        let user_entries = session
            .entries()
            .iter()
            .filter(|entry| entry.speaker == Speaker::User)
            .map(|entry| entry.content.as_str())
            .collect::<Vec<_>>();
        assert_eq!(user_entries, vec!["hello", "company_shares"]);
    }

    #[tokio::test]
    async fn reset_command_clears_history() {
        let agent = AgentRuntime::new(KeywordResponder::default());
        let mut session = Conversation::new();
        let mut output = Vec::new();

        let summary = run_session(
            &agent,
            &mut session,
            &b"I own startup shares\n/reset\n"[..],
            &mut output,
        )
        .await
        .expect("in-memory session should not fail");

        assert_eq!(summary, super::SessionSummary { turns: 1, resets: 1 });
        assert_eq!(session.entries().len(), 1);
        assert_eq!(session.current_step(), "welcome");
        let transcript = String::from_utf8(output).expect("transcript is utf-8");
        assert!(transcript.contains("Conversation cleared."));
    }
}
