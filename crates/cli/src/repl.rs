//! Interactive prompt: reads instructions, runs the agent, prints answers.

use agent::{AgentRuntime, SessionState};
use proto::{LlmError, ProgressEvent};
use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tools::BrowserHandle;
use tracing::{info, warn};

const PROMPT: &str = "webprobe> ";
const PROGRESS_PREVIEW_CHARS: usize = 120;

/// Why the interactive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplExit {
    /// `quit` or `exit`.
    Quit,
    /// Input closed.
    EndOfInput,
    /// Ctrl-C or SIGTERM.
    Interrupted,
}

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Clear,
    Instruction(String),
}

/// Classifies a raw input line; blank lines yield `None`.
pub fn parse_line(raw: &str) -> Option<ReplCommand> {
    let line = raw.trim();
    if line.is_empty() {
        return None;
    }
    Some(match line.to_lowercase().as_str() {
        "quit" | "exit" => ReplCommand::Quit,
        "clear" => ReplCommand::Clear,
        _ => ReplCommand::Instruction(line.to_string()),
    })
}

/// Operator-facing text for a failed instruction.
pub fn format_error(err: &proto::Error) -> String {
    match err {
        proto::Error::Llm(LlmError::Configuration(msg)) => format!("Configuration error: {msg}"),
        proto::Error::Config(e) => format!("Configuration error: {e}"),
        other => format!("Error: {other}"),
    }
}

fn preview(text: &str) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= PROGRESS_PREVIEW_CHARS {
        return single_line;
    }
    let kept: String = single_line.chars().take(PROGRESS_PREVIEW_CHARS).collect();
    format!("{kept}...")
}

/// One status line per progress event; the first decide round stays quiet.
pub fn render_progress(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::LlmThinking { round: 0 } => None,
        ProgressEvent::LlmThinking { round } => Some(format!("  ... thinking (round {})", round + 1)),
        ProgressEvent::ToolCallStarted {
            tool_name, args, ..
        } => Some(format!("  -> {tool_name} {args}")),
        ProgressEvent::ToolCallFinished {
            tool_name,
            output,
            is_error,
            ..
        } => {
            let mark = if *is_error { "x" } else { "ok" };
            Some(format!("  [{mark}] {tool_name}: {}", preview(output)))
        }
    }
}

/// Prints progress lines until the sender side is dropped.
pub fn spawn_progress_printer(mut rx: mpsc::Receiver<ProgressEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = rx.recv().await {
            if let Some(line) = render_progress(&event)
                && write_out(&mut stdout, &format!("{line}\n")).await.is_err()
            {
                break;
            }
        }
    })
}

async fn write_out<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> std::io::Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.flush().await
}

/// Runs one instruction with live progress, returning the answer or error text.
pub async fn run_instruction(
    runtime: &AgentRuntime,
    state: &mut SessionState,
    input: &str,
) -> Result<String, proto::Error> {
    let (tx, rx) = mpsc::channel(64);
    let printer = spawn_progress_printer(rx);
    let result = runtime.run(state, input, Some(&tx)).await;
    drop(tx);
    if let Err(e) = printer.await {
        warn!(error = %e, "Progress printer stopped unexpectedly");
    }
    result
}

/// Interactive loop over `input`. Always closes the browser before returning.
///
/// `interrupt` resolving ends the loop at once, also while an instruction
/// is running; the in-flight run is dropped.
pub async fn run_repl<R, W, I>(
    runtime: &AgentRuntime,
    browser: &BrowserHandle,
    input: R,
    out: &mut W,
    interrupt: I,
) -> anyhow::Result<ReplExit>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    I: Future<Output = ()>,
{
    let mut lines = input.lines();
    let mut state = SessionState::new();
    tokio::pin!(interrupt);
    info!("REPL started (session: {})", state.id);

    let outcome: anyhow::Result<ReplExit> = async {
        write_out(
            out,
            "webprobe - website testing agent\n\
             Type testing instructions in plain English.\n\
             Type 'quit' or 'exit' to leave, 'clear' to start a new session.\n\n",
        )
        .await?;

        Ok(loop {
            write_out(out, PROMPT).await?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = &mut interrupt => break ReplExit::Interrupted,
            };
            let Some(line) = line else {
                break ReplExit::EndOfInput;
            };

            let Some(command) = parse_line(&line) else {
                continue;
            };
            match command {
                ReplCommand::Quit => break ReplExit::Quit,
                ReplCommand::Clear => {
                    info!(
                        session = %state.id,
                        started_at = %state.started_at,
                        tool_calls = state.results.len(),
                        "Session cleared"
                    );
                    state.reset();
                    write_out(out, "Session cleared. Starting fresh.\n\n").await?;
                }
                ReplCommand::Instruction(input) => {
                    let result = tokio::select! {
                        result = run_instruction(runtime, &mut state, &input) => result,
                        _ = &mut interrupt => break ReplExit::Interrupted,
                    };
                    let text = match result {
                        Ok(answer) => format!("\n{answer}\n\n"),
                        Err(e) => {
                            warn!(error = %e, "Instruction failed");
                            format!("\n{}\n\n", format_error(&e))
                        }
                    };
                    write_out(out, &text).await?;
                }
            }
        })
    }
    .await;

    browser.shutdown().await;
    let farewell = write_out(out, "\nGoodbye!\n").await;
    info!(
        session = %state.id,
        started_at = %state.started_at,
        tool_calls = state.results.len(),
        prompt_tokens = state.usage.prompt_tokens,
        completion_tokens = state.usage.completion_tokens,
        "REPL stopped"
    );
    let exit = outcome?;
    farewell?;
    Ok(exit)
}
