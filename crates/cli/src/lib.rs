pub mod bootstrap;
pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use resolute_core::config::{ConfigOverrides, LoadOptions, PrecedentBackend};

#[derive(Debug, Parser)]
#[command(
    name = "resolute",
    about = "Resolute support agent CLI",
    long_about = "Chat with the customer-support resolution agent, seed its precedent graph, and inspect runtime readiness.",
    after_help = "Examples:\n  resolute seed\n  resolute chat\n  resolute doctor --json\n  resolute config"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Path to a TOML config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Sqlite,
    Memory,
}

impl From<BackendArg> for PrecedentBackend {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Sqlite => PrecedentBackend::Sqlite,
            BackendArg::Memory => PrecedentBackend::Memory,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive support conversation on stdin/stdout")]
    Chat {
        #[arg(long, help = "Refuse refunds until the order and returns policy were checked")]
        enforce_refund_prerequisites: bool,
        #[arg(long, value_enum, help = "Where precedent cases are looked up")]
        precedent_backend: Option<BackendArg>,
    },
    #[command(about = "Apply migrations and load the canonical precedent cases")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, API key, policy documents, and precedent storage")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let base = LoadOptions { config_path: cli.config.clone(), ..LoadOptions::default() };

    let result = match cli.command {
        Command::Chat { enforce_refund_prerequisites, precedent_backend } => {
            let overrides = ConfigOverrides {
                enforce_refund_prerequisites: enforce_refund_prerequisites.then_some(true),
                precedent_backend: precedent_backend.map(PrecedentBackend::from),
                ..ConfigOverrides::default()
            };
            commands::chat::run(LoadOptions { overrides, ..base })
        }
        Command::Seed => commands::seed::run(base),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(base) }
        }
        Command::Doctor { json } => commands::doctor::run(base, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
