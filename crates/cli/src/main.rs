use std::process::ExitCode;

fn main() -> ExitCode {
    resolute_cli::run()
}
