use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::Serialize;
use tokenize_core::config::LoadOptions;
use tokenize_core::{MarkupParser, Segment, TurnResult};

use crate::commands::{load_config, serialize_json, CommandResult, EXIT_USAGE};

const COMMAND: &str = "parse";

#[derive(Debug, Serialize)]
struct ParseReport {
    command: &'static str,
    status: &'static str,
    malformed_cards: &'static str,
    segments: Vec<Segment>,
    result: TurnResult,
}

/// Extracts markup from a file, or from stdin when no file is given.
pub fn run(options: &LoadOptions, file: Option<&Path>) -> CommandResult {
    let raw = match file {
        Some(path) => fs::read_to_string(path).map_err(|error| {
            format!("could not read `{}`: {error}", path.display())
        }),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map(|_| buffer)
                .map_err(|error| format!("could not read stdin: {error}"))
        }
    };

    match raw {
        Ok(raw) => run_with_input(options, &raw),
        Err(message) => CommandResult::failure(COMMAND, "input_unreadable", message, EXIT_USAGE),
    }
}

pub fn run_with_input(options: &LoadOptions, raw: &str) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let parser = MarkupParser::new(config.markup.malformed_cards);
    let report = ParseReport {
        command: COMMAND,
        status: "ok",
        malformed_cards: parser.malformed_card_policy().as_str(),
        segments: parser.segments(raw),
        result: parser.extract(raw),
    };
    serialize_json(COMMAND, &report)
}
