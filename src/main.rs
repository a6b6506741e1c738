//! Binary entry point for the tugblock CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Top-level statements and comment runs, with positions
//! tugblock statements src/mod.py
//!
//! # String literals with recovered start positions
//! tugblock strings src/mod.py
//!
//! # `name = <literal>` assignments, from stdin
//! cat setup.py | tugblock assignments -
//!
//! # Runs of imports / comments / docstrings / code
//! tugblock --flags print_function groups src/mod.py
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use tugblock::cli::{
    emit, load_block, run_assignments, run_groups, run_statements, run_strings, STDIN_PATH,
};
use tugblock::config::{CliOverrides, ResolvedConfig};
use tugblock::error::CliError;
use tugblock::output::{emit_response, ErrorResponse};
use tugblock::{CompilerFlags, OutputErrorCode};

// ============================================================================
// CLI Structure
// ============================================================================

/// Statement-granular views of Python source.
///
/// All output is JSON.
#[derive(Parser, Debug)]
#[command(name = "tugblock", version, about = "Statement-granular views of Python source")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Compiler flags for parsing: hex (`0x10000`), decimal, or feature
    /// names (`print_function,division`).
    #[arg(long, global = true, value_parser = parse_flags)]
    flags: Option<CompilerFlags>,

    /// Emit single-line JSON.
    #[arg(long, global = true)]
    compact: bool,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Write log lines to stderr as JSON.
    #[arg(long, global = true)]
    log_json: bool,
}

fn parse_flags(s: &str) -> Result<CompilerFlags, String> {
    s.parse::<CompilerFlags>().map_err(|e| e.to_string())
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

/// CLI subcommands. `FILE` is a path, or `-` for stdin.
#[derive(Subcommand, Debug)]
enum Command {
    /// List top-level statements and comment/blank runs.
    Statements {
        #[arg(default_value = STDIN_PATH)]
        file: PathBuf,
    },
    /// List string literals in source order.
    Strings {
        #[arg(default_value = STDIN_PATH)]
        file: PathBuf,
    },
    /// Evaluate `name = <literal>` assignments.
    Assignments {
        #[arg(default_value = STDIN_PATH)]
        file: PathBuf,
    },
    /// Group consecutive statements by kind.
    Groups {
        #[arg(default_value = STDIN_PATH)]
        file: PathBuf,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_json);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // errors go to stdout as JSON, like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_target(false)
            .with_writer(io::stderr)
            .init();
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), CliError> {
    let overrides = CliOverrides {
        flags: cli.global.flags,
        compact: cli.global.compact.then_some(true),
    };
    let config = ResolvedConfig::resolve(&overrides);
    let compact = config.compact.value;
    let mut stdout = io::stdout();

    match cli.command {
        Command::Statements { file } => {
            let block = load_block(&file, &config)?;
            emit(&run_statements(&block)?, compact, &mut stdout)?;
        }
        Command::Strings { file } => {
            let block = load_block(&file, &config)?;
            emit(&run_strings(&block)?, compact, &mut stdout)?;
        }
        Command::Assignments { file } => {
            let block = load_block(&file, &config)?;
            emit(&run_assignments(&block)?, compact, &mut stdout)?;
        }
        Command::Groups { file } => {
            let block = load_block(&file, &config)?;
            emit(&run_groups(&block)?, compact, &mut stdout)?;
        }
    }
    let _ = stdout.flush();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_accept_feature_names() {
        let cli = Cli::try_parse_from([
            "tugblock",
            "--flags",
            "print_function,division",
            "statements",
            "a.py",
        ])
        .unwrap();
        assert_eq!(
            cli.global.flags,
            Some(CompilerFlags::PRINT_FUNCTION | CompilerFlags::DIVISION)
        );
    }

    #[test]
    fn bad_flags_are_rejected() {
        assert!(Cli::try_parse_from(["tugblock", "--flags", "no_such", "groups"]).is_err());
    }

    #[test]
    fn file_defaults_to_stdin() {
        let cli = Cli::try_parse_from(["tugblock", "strings"]).unwrap();
        match cli.command {
            Command::Strings { file } => assert_eq!(file, PathBuf::from("-")),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
