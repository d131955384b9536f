//! Loom CLI — the command-line driver for the Loom incremental compiler.
//!
//! Provides `loom compile` for a one-shot compile of the current project,
//! `loom resolve` for replaying saved compiler outputs through the chunk
//! cache, and `loom session` for driving the debounced recompile pipeline
//! from an editor over JSON lines.

#![warn(missing_docs)]

mod compile;
mod project;
mod resolve;
mod session;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Loom — incremental compilation for interactive fiction.
#[derive(Parser, Debug)]
#[command(name = "loom", version, about = "Loom incremental compiler driver")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `loom.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile the current project once.
    Compile(CompileArgs),
    /// Resolve saved compiler outputs through one chunk cache.
    Resolve(ResolveArgs),
    /// Run an editor session over stdin/stdout JSON lines.
    Session(SessionArgs),
}

/// Arguments for the `loom compile` subcommand.
#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `loom resolve` subcommand.
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Compiler output JSON files, resolved in order.
    #[arg(required = true)]
    pub outputs: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `loom session` subcommand.
#[derive(Parser, Debug)]
pub struct SessionArgs {
    /// Override the configured debounce period, in milliseconds.
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// Start with an empty buffer map instead of loading sources from disk.
    #[arg(long)]
    pub no_load: bool,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON lines.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Compile(ref args) => compile::run(args, &global),
        Command::Resolve(ref args) => resolve::run(args, &global),
        Command::Session(ref args) => session::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the flag-derived level.
fn init_logging(global: &GlobalArgs) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_level(global).into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_log_level(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn global(quiet: bool, verbose: bool) -> GlobalArgs {
        GlobalArgs {
            quiet,
            verbose,
            config: None,
        }
    }

    #[test]
    fn parse_compile_default() {
        let cli = Cli::parse_from(["loom", "compile"]);
        match cli.command {
            Command::Compile(ref args) => assert_eq!(args.format, ReportFormat::Text),
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn parse_compile_json() {
        let cli = Cli::parse_from(["loom", "compile", "--format", "json"]);
        match cli.command {
            Command::Compile(ref args) => assert_eq!(args.format, ReportFormat::Json),
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn parse_resolve_files() {
        let cli = Cli::parse_from(["loom", "resolve", "one.json", "two.json"]);
        match cli.command {
            Command::Resolve(ref args) => {
                assert_eq!(
                    args.outputs,
                    vec![PathBuf::from("one.json"), PathBuf::from("two.json")]
                );
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Resolve command"),
        }
    }

    #[test]
    fn resolve_requires_a_file() {
        assert!(Cli::try_parse_from(["loom", "resolve"]).is_err());
    }

    #[test]
    fn parse_session_flags() {
        let cli = Cli::parse_from(["loom", "session", "--debounce-ms", "0", "--no-load"]);
        match cli.command {
            Command::Session(ref args) => {
                assert_eq!(args.debounce_ms, Some(0));
                assert!(args.no_load);
            }
            _ => panic!("expected Session command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["loom", "--quiet", "compile"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_verbose_after_subcommand() {
        let cli = Cli::parse_from(["loom", "session", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["loom", "--config", "/tmp/loom.toml", "compile"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/loom.toml"));
    }

    #[test]
    fn log_level_follows_flags() {
        assert_eq!(default_log_level(&global(false, false)), "warn");
        assert_eq!(default_log_level(&global(false, true)), "debug");
        assert_eq!(default_log_level(&global(true, true)), "error");
    }
}
