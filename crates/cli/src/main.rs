use std::process::ExitCode;

fn main() -> ExitCode {
    tokenize_cli::run()
}
