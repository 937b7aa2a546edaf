pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokenize_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use tokenize_core::MalformedCardPolicy;

#[derive(Debug, Parser)]
#[command(
    name = "tokenize",
    about = "TokenizeAI conversation CLI",
    long_about = "Chat with the TokenizeAI assistant, run single turns, inspect reply markup, and view effective configuration.",
    after_help = "Examples:\n  tokenize chat\n  tokenize turn \"I own 5000 shares of Acme\" --json\n  tokenize parse --file reply.txt\n  tokenize config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a tokenize.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override logging.level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Override logging.format (compact|pretty|json)")]
    log_format: Option<LogFormat>,
    #[arg(long, global = true, help = "Override markup.malformed_cards (preserve|strip)")]
    malformed_cards: Option<MalformedCardPolicy>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive conversation on stdin/stdout")]
    Chat,
    #[command(about = "Run a single turn and print the rendered or structured result")]
    Turn {
        #[arg(help = "User message for this turn")]
        text: String,
        #[arg(long, help = "Current conversation step (defaults to session.initial_step)")]
        step: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Extract cards, choices and documents from raw reply text")]
    Parse {
        #[arg(long, help = "Read reply text from this file instead of stdin")]
        file: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                log_level: self.log_level.clone(),
                log_format: self.log_format,
                malformed_cards: self.malformed_cards,
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match &cli.command {
        Command::Chat => commands::chat::run(&options),
        Command::Turn { text, step, json } => {
            commands::turn::run(&options, text, step.as_deref(), *json)
        }
        Command::Parse { file } => commands::parse::run(&options, file.as_deref()),
        Command::Config => commands::config::run(&options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command output on stdout stays parseable.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
