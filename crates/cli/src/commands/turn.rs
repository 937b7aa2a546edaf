use serde::Serialize;
use tokenize_agent::AgentRuntime;
use tokenize_core::config::LoadOptions;
use tokenize_core::{present, TurnInput, TurnResult};

use crate::commands::{current_thread_runtime, load_config, serialize_json, CommandResult, EXIT_USAGE};

const COMMAND: &str = "turn";

#[derive(Debug, Serialize)]
struct TurnReport<'a> {
    command: &'static str,
    status: &'static str,
    current_step: &'a str,
    result: &'a TurnResult,
}

/// Runs a single stateless turn through the keyword responder.
pub fn run(options: &LoadOptions, text: &str, step: Option<&str>, json: bool) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let step = step.unwrap_or(&config.session.initial_step);
    let input = match TurnInput::new(text, step) {
        Ok(input) => input,
        Err(error) => {
            return CommandResult::failure(COMMAND, "invalid_turn", error.to_string(), EXIT_USAGE)
        }
    };

    let runtime = match current_thread_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };
    let agent = AgentRuntime::from_config(&config);
    let result = runtime.block_on(agent.handle_turn(&input));

    if !json {
        return CommandResult::plain(present::render_turn(&result));
    }

    let report = TurnReport {
        command: COMMAND,
        status: if result.is_fallback() { "fallback" } else { "ok" },
        current_step: input.current_step(),
        result: &result,
    };
    serialize_json(COMMAND, &report)
}
