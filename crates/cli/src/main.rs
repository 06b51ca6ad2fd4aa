//! `orglink`: link organization records across two tables.

mod exit_codes;
mod export;
mod link;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use env_logger::Env;

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "orglink")]
#[command(about = "Match organization records between two tables (blocking, comparison, best match)")]
#[command(version)]
struct Cli {
    /// Debug logging (per-pass configuration, vocabulary size)
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors on stderr
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every pass of a .link.toml config
    #[command(after_help = "\
Examples:
  orglink run postings.link.toml
  orglink run postings.link.toml --json
  orglink run postings.link.toml --output result.json --matches matches.tsv
  RUST_LOG=debug orglink run postings.link.toml")]
    Run {
        /// Path to the .link.toml config file
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the matches as a delimited table (config delimiter)
        #[arg(long)]
        matches: Option<PathBuf>,

        /// Exit non-zero when no pass produced a match
        #[arg(long)]
        fail_on_empty: bool,
    },

    /// Validate a link config without reading any data
    #[command(after_help = "\
Examples:
  orglink validate postings.link.toml")]
    Validate {
        /// Path to the .link.toml config file
        config: PathBuf,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run { config, json, output, matches, fail_on_empty } => {
            link::cmd_run(config, json, output, matches, fail_on_empty)
        }
        Commands::Validate { config } => link::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
