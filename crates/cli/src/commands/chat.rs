use anyhow::Context;
use resolute_agent::{AgentRuntime, Session};
use resolute_core::config::LoadOptions;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;
use uuid::Uuid;

use crate::bootstrap::bootstrap;
use crate::commands::{build_runtime, load_config, CommandResult};
use crate::logging::init_logging;

const PROMPT: &str = "you> ";
const AGENT_PREFIX: &str = "agent> ";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatSummary {
    pub session_id: Uuid,
    pub turns_completed: usize,
    pub turns_failed: usize,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match load_config("chat", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    init_logging(&config);

    let runtime = match build_runtime("chat") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    runtime.block_on(async {
        let app = match bootstrap(config).await {
            Ok(app) => app,
            Err(error) => {
                let (error_class, exit_code) = error.classify();
                return CommandResult::failure("chat", error_class, error.to_string(), exit_code);
            }
        };

        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        let outcome = tokio::select! {
            outcome = run_session(&app.agent_runtime, stdin, stdout) => outcome,
            _ = tokio::signal::ctrl_c() => {
                info!(event_name = "cli.chat.interrupted", "chat interrupted");
                return CommandResult::success("chat", "session interrupted");
            }
        };

        if let Some(pool) = app.db_pool {
            pool.close().await;
        }

        match outcome {
            Ok(summary) => CommandResult::success(
                "chat",
                format!(
                    "session {} ended after {} turns ({} failed)",
                    summary.session_id, summary.turns_completed, summary.turns_failed
                ),
            ),
            Err(error) => CommandResult::failure("chat", "terminal_io", format!("{error:#}"), 1),
        }
    })
}

/// Reads one user message per line until `exit`, `quit` or end of input.
///
/// A failed turn is reported on the writer and the session keeps going.
pub async fn run_session<R, W>(
    runtime: &AgentRuntime,
    reader: R,
    mut writer: W,
) -> anyhow::Result<ChatSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = Session::new();
    let mut summary =
        ChatSummary { session_id: session.id(), turns_completed: 0, turns_failed: 0 };
    let mut lines = reader.lines();

    info!(
        event_name = "cli.chat.session_started",
        session_id = %session.id(),
        "chat session started"
    );

    loop {
        writer.write_all(PROMPT.as_bytes()).await.context("failed to write prompt")?;
        writer.flush().await.context("failed to flush prompt")?;

        let Some(line) = lines.next_line().await.context("failed to read user input")? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = match runtime.handle_turn(&mut session, input).await {
            Ok(text) => {
                summary.turns_completed += 1;
                format!("{AGENT_PREFIX}{text}\n")
            }
            Err(error) => {
                summary.turns_failed += 1;
                format!("{AGENT_PREFIX}[error] {error}\n")
            }
        };
        writer.write_all(reply.as_bytes()).await.context("failed to write reply")?;
    }

    writer.flush().await.context("failed to flush output")?;
    info!(
        event_name = "cli.chat.session_ended",
        session_id = %summary.session_id,
        turns_completed = summary.turns_completed,
        turns_failed = summary.turns_failed,
        "chat session ended"
    );
    Ok(summary)
}
