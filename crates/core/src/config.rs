use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::turn::DEFAULT_STEP;
use crate::markup::MalformedCardPolicy;

pub const CONFIG_FILE_NAME: &str = "tokenize.toml";

const MAX_TIMEOUT_MS: u64 = 300_000;
const MAX_SIMULATED_LATENCY_MS: u64 = 10_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub responder: ResponderConfig,
    pub markup: MarkupConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponderConfig {
    /// Artificial delay before a canned reply is returned. Zero disables it.
    pub simulated_latency_ms: u64,
    /// Deadline around generation. Zero disables it.
    pub timeout_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupConfig {
    pub malformed_cards: MalformedCardPolicy,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub initial_step: String,
    pub greeting: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub simulated_latency_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub malformed_cards: Option<MalformedCardPolicy>,
    pub initial_step: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            responder: ResponderConfig { simulated_latency_ms: 0, timeout_ms: 30_000 },
            markup: MarkupConfig { malformed_cards: MalformedCardPolicy::Preserve },
            session: SessionConfig { initial_step: DEFAULT_STEP.to_string(), greeting: true },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(responder) = patch.responder {
            if let Some(simulated_latency_ms) = responder.simulated_latency_ms {
                self.responder.simulated_latency_ms = simulated_latency_ms;
            }
            if let Some(timeout_ms) = responder.timeout_ms {
                self.responder.timeout_ms = timeout_ms;
            }
        }

        if let Some(markup) = patch.markup {
            if let Some(malformed_cards) = markup.malformed_cards {
                self.markup.malformed_cards = malformed_cards;
            }
        }

        if let Some(session) = patch.session {
            if let Some(initial_step) = session.initial_step {
                self.session.initial_step = initial_step;
            }
            if let Some(greeting) = session.greeting {
                self.session.greeting = greeting;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TOKENIZE_RESPONDER_SIMULATED_LATENCY_MS") {
            self.responder.simulated_latency_ms =
                parse_u64("TOKENIZE_RESPONDER_SIMULATED_LATENCY_MS", &value)?;
        }
        if let Some(value) = read_env("TOKENIZE_RESPONDER_TIMEOUT_MS") {
            self.responder.timeout_ms = parse_u64("TOKENIZE_RESPONDER_TIMEOUT_MS", &value)?;
        }

        if let Some(value) = read_env("TOKENIZE_MARKUP_MALFORMED_CARDS") {
            self.markup.malformed_cards = value.parse()?;
        }

        if let Some(value) = read_env("TOKENIZE_SESSION_INITIAL_STEP") {
            self.session.initial_step = value;
        }
        if let Some(value) = read_env("TOKENIZE_SESSION_GREETING") {
            self.session.greeting = parse_bool("TOKENIZE_SESSION_GREETING", &value)?;
        }

        let log_level =
            read_env("TOKENIZE_LOGGING_LEVEL").or_else(|| read_env("TOKENIZE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TOKENIZE_LOGGING_FORMAT").or_else(|| read_env("TOKENIZE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(simulated_latency_ms) = overrides.simulated_latency_ms {
            self.responder.simulated_latency_ms = simulated_latency_ms;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.responder.timeout_ms = timeout_ms;
        }
        if let Some(malformed_cards) = overrides.malformed_cards {
            self.markup.malformed_cards = malformed_cards;
        }
        if let Some(initial_step) = overrides.initial_step {
            self.session.initial_step = initial_step;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_responder(&self.responder)?;
        validate_session(&self.session)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), Path::new("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_responder(responder: &ResponderConfig) -> Result<(), ConfigError> {
    if responder.timeout_ms > MAX_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "responder.timeout_ms must be in range 0..={MAX_TIMEOUT_MS} (0 disables the deadline)"
        )));
    }

    if responder.simulated_latency_ms > MAX_SIMULATED_LATENCY_MS {
        return Err(ConfigError::Validation(format!(
            "responder.simulated_latency_ms must be in range 0..={MAX_SIMULATED_LATENCY_MS}"
        )));
    }

    if responder.timeout_ms > 0 && responder.simulated_latency_ms >= responder.timeout_ms {
        return Err(ConfigError::Validation(
            "responder.simulated_latency_ms must be lower than responder.timeout_ms".to_string(),
        ));
    }

    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.initial_step.trim().is_empty() {
        return Err(ConfigError::Validation(
            "session.initial_step must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    responder: Option<ResponderPatch>,
    markup: Option<MarkupPatch>,
    session: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponderPatch {
    simulated_latency_ms: Option<u64>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MarkupPatch {
    malformed_cards: Option<MalformedCardPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    initial_step: Option<String>,
    greeting: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
