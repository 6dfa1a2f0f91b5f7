//! Binary entry point for the typecomp CLI.
//!
//! Prints type-annotation completion data as JSON.
//!
//! ## Usage
//!
//! ```bash
//! # List the type symbols a file defines
//! typecomp symbols src/models.py
//!
//! # Completions at line 12, character 8 (0-indexed), scanning the workspace first
//! typecomp --workspace . complete src/app.py --line 12 --character 8
//!
//! # Preselect an expected name and use custom settings
//! typecomp --config typecomp.json complete src/app.py --line 3 --character 4 --target User
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use typecomp::cli::{run_complete, run_symbols, SessionOptions};
use typecomp::completion::CompletionRequest;
use typecomp::error::{OutputErrorCode, TypecompError};
use typecomp::output::{emit_response, ErrorResponse, OkResponse};
use typecomp::types::Position;

// ============================================================================
// CLI Structure
// ============================================================================

/// Type-annotation completions for Python.
#[derive(Parser, Debug)]
#[command(name = "typecomp", version, about = "Type-annotation completions for Python")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Workspace root to scan before answering.
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// JSON settings file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// List the type symbols defined in a file.
    Symbols {
        /// Python source file.
        file: PathBuf,
    },
    /// Compute completion candidates at a position.
    Complete {
        /// Python source file.
        file: PathBuf,
        /// Line (0-indexed).
        #[arg(long)]
        line: u32,
        /// Character within the line (0-indexed).
        #[arg(long)]
        character: u32,
        /// Expected name; an exact match is preselected.
        #[arg(long)]
        target: Option<String>,
        /// Answer even outside an annotation context.
        #[arg(long)]
        force: bool,
    },
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.log_level);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber. `RUST_LOG` overrides `--log-level`.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
async fn execute(cli: Cli) -> Result<(), TypecompError> {
    let options = SessionOptions {
        workspace: cli.global.workspace,
        config: cli.global.config,
    };

    match cli.command {
        Command::Symbols { file } => {
            let response = run_symbols(&file, &options).await?;
            emit(&OkResponse::new(response))
        }
        Command::Complete {
            file,
            line,
            character,
            target,
            force,
        } => {
            let request = CompletionRequest {
                position: Position::new(line, character),
                trigger: None,
                target_name: target,
                forced: force,
            };
            let response = run_complete(&file, &request, &options).await?;
            emit(&OkResponse::new(response))
        }
    }
}

fn emit<T: serde::Serialize>(response: &T) -> Result<(), TypecompError> {
    emit_response(response, &mut io::stdout()).map_err(|e| TypecompError::internal(e.to_string()))?;
    let _ = io::stdout().flush();
    Ok(())
}
