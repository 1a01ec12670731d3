//! CLI entrypoint and subcommand orchestration.

mod config;
mod repl;
mod signal;
#[cfg(test)]
mod test_support;

use clap::{Parser, Subcommand};

#[cfg(not(test))]
use std::sync::Arc;

#[cfg(not(test))]
use agent::{AgentRuntime, OpenAiProvider, SessionState, ToolRegistry, llm::check_api_key};
#[cfg(not(test))]
use config::Config;
#[cfg(not(test))]
use tools::{BrowserHandle, BrowserSession, ChromiumEngine, browser_tools};
#[cfg(not(test))]
use tracing::{error, info, warn};
#[cfg(not(test))]
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter for the `--debug` log file: everything from this workspace, less
/// from the HTTP and CDP stacks underneath.
const DEBUG_FILE_FILTER: &str = "debug,hyper_util=info,rustls=info,reqwest=info,chromiumoxide=info,tungstenite=info";

/// Top-level command-line arguments for webprobe.
#[derive(Parser)]
#[command(name = "webprobe")]
#[command(about = "Natural-language website testing agent", version)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Enable debug logging to ~/.webprobe/logs/debug.log.YYYY-MM-DD
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Run the browser without a window (overrides config)
    #[arg(long, default_value_t = false)]
    headless: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// CLI subcommands available in the application.
#[derive(Subcommand)]
enum Commands {
    /// Interactive prompt (default when no subcommand is given)
    Repl,

    /// Run a single instruction and exit
    Run {
        /// Instruction to send to the agent
        #[arg(short = 'e', long)]
        exec: String,
    },
}

impl Commands {
    fn label(&self) -> &'static str {
        match self {
            Commands::Repl => "repl",
            Commands::Run { .. } => "run",
        }
    }
}

/// Formats the one-shot header line.
fn format_run_header(exec: &str) -> String {
    format!("webprobe run: {exec}")
}

#[cfg(not(test))]
#[tokio::main]
/// Program entrypoint.
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Repl);

    // When --debug is passed, write debug-level logs to ~/.webprobe/logs/
    // using daily rotation so logs accumulate across sessions.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // WorkerGuard must outlive main() so buffered file writes are flushed on exit.
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>;

    if cli.debug {
        let log_dir = config::webprobe_home().join("logs");
        std::fs::create_dir_all(&log_dir).ok();
        let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        _file_guard = Some(guard);

        let console = fmt::layer().with_target(false).with_filter(console_filter);
        let file = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .with_filter(EnvFilter::new(DEBUG_FILE_FILTER));
        tracing_subscriber::registry()
            .with(console)
            .with(file)
            .init();

        info!(
            version = env!("CARGO_PKG_VERSION"),
            command = command.label(),
            log_level = %cli.log_level,
            "========== webprobe session start =========="
        );
    } else {
        _file_guard = None;
        fmt()
            .with_env_filter(console_filter)
            .with_target(false)
            .init();
    }

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {e}");
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };
    if cli.headless {
        config.browser.headless = true;
    }

    let (runtime, browser) = build_runtime(&config);

    match command {
        Commands::Repl => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            let exit = repl::run_repl(
                &runtime,
                &browser,
                stdin,
                &mut stdout,
                signal::wait_for_interrupt(),
            )
            .await?;
            if exit == repl::ReplExit::Interrupted {
                // A pending stdin read blocks runtime shutdown; leave without it.
                drop(_file_guard);
                std::process::exit(130);
            }
            Ok(())
        }
        Commands::Run { exec } => cmd_run(&runtime, &browser, exec).await,
    }
}

#[cfg(not(test))]
/// Wires the browser handle, tools, LLM provider, and runtime together.
fn build_runtime(config: &Config) -> (AgentRuntime, BrowserHandle) {
    let engine = match &config.browser.chrome_path {
        Some(path) => ChromiumEngine::with_executable(path),
        None => ChromiumEngine::new(),
    };
    let session = BrowserSession::new(Arc::new(engine), config.browser.session_options());
    let browser = BrowserHandle::new(session, config.browser.headless);

    // Tool registry
    let mut registry = ToolRegistry::new();
    for tool in browser_tools(&browser, &config.browser.screenshot_dir) {
        registry.register_shared(tool);
    }
    let registry = Arc::new(registry);

    // LLM provider
    let api_key = config.resolve_api_key();
    if let Err(e) = check_api_key(&api_key) {
        warn!("{e}");
    }
    let llm: Arc<dyn agent::LlmProvider> = match config.agent.effective_base_url() {
        Some(base_url) => Arc::new(OpenAiProvider::with_base_url(api_key, base_url)),
        None => Arc::new(OpenAiProvider::new(api_key)),
    };

    let runtime = AgentRuntime::new(
        llm,
        registry,
        config.agent.model.clone(),
        config.agent.max_tool_rounds,
    )
    .with_target_url(&config.target.base_url)
    .with_temperature(config.agent.temperature);
    info!(
        model = %runtime.model(),
        headless = config.browser.headless,
        target = %config.target.base_url,
        "Runtime ready"
    );

    (runtime, browser)
}

#[cfg(not(test))]
/// Runs one instruction, prints the answer, and closes the browser.
async fn cmd_run(runtime: &AgentRuntime, browser: &BrowserHandle, exec: String) -> anyhow::Result<()> {
    let mut state = SessionState::new();
    println!("{}", format_run_header(&exec));

    let result = tokio::select! {
        result = repl::run_instruction(runtime, &mut state, &exec) => Some(result),
        _ = signal::wait_for_interrupt() => None,
    };
    browser.shutdown().await;

    match result {
        Some(Ok(text)) => {
            println!("{text}");
            Ok(())
        }
        Some(Err(e)) => {
            eprintln!("{}", repl::format_error(&e));
            std::process::exit(1);
        }
        None => {
            eprintln!("Interrupted");
            std::process::exit(130);
        }
    }
}
