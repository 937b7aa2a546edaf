use std::env;
use std::fs;
use std::path::Path;

use tokenize_core::config::{resolve_config_path, LoadOptions};
use toml::Value;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "config";

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let source = FieldSources {
        doc: load_config_file_doc(config_file_path.as_deref()),
        path: config_file_path.as_deref(),
    };

    let mut lines = vec![
        "effective config (source precedence: flag > env > file > default):".to_string()
    ];

    lines.push(render_line(
        "responder.simulated_latency_ms",
        &config.responder.simulated_latency_ms.to_string(),
        source.of("responder.simulated_latency_ms", &["TOKENIZE_RESPONDER_SIMULATED_LATENCY_MS"]),
    ));
    lines.push(render_line(
        "responder.timeout_ms",
        &render_timeout(config.responder.timeout_ms),
        source.of("responder.timeout_ms", &["TOKENIZE_RESPONDER_TIMEOUT_MS"]),
    ));
    lines.push(render_line(
        "markup.malformed_cards",
        config.markup.malformed_cards.as_str(),
        flag_or(
            options.overrides.malformed_cards.is_some(),
            "--malformed-cards",
            source.of("markup.malformed_cards", &["TOKENIZE_MARKUP_MALFORMED_CARDS"]),
        ),
    ));
    lines.push(render_line(
        "session.initial_step",
        &config.session.initial_step,
        source.of("session.initial_step", &["TOKENIZE_SESSION_INITIAL_STEP"]),
    ));
    lines.push(render_line(
        "session.greeting",
        &config.session.greeting.to_string(),
        source.of("session.greeting", &["TOKENIZE_SESSION_GREETING"]),
    ));
    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        flag_or(
            options.overrides.log_level.is_some(),
            "--log-level",
            source.of("logging.level", &["TOKENIZE_LOGGING_LEVEL", "TOKENIZE_LOG_LEVEL"]),
        ),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format).to_ascii_lowercase(),
        flag_or(
            options.overrides.log_format.is_some(),
            "--log-format",
            source.of("logging.format", &["TOKENIZE_LOGGING_FORMAT", "TOKENIZE_LOG_FORMAT"]),
        ),
    ));

    CommandResult::plain(lines.join("\n"))
}

struct FieldSources<'a> {
    doc: Option<Value>,
    path: Option<&'a Path>,
}

impl FieldSources<'_> {
    fn of(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn flag_or(flag_set: bool, flag: &str, fallback: String) -> String {
    if flag_set {
        format!("flag ({flag})")
    } else {
        fallback
    }
}

fn render_timeout(timeout_ms: u64) -> String {
    if timeout_ms == 0 {
        "0 (disabled)".to_string()
    } else {
        timeout_ms.to_string()
    }
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
