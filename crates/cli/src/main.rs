mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use commands::{
    cmd_broken, cmd_check, cmd_merge, cmd_narrow, cmd_orphans, cmd_query, cmd_recent, cmd_remove,
};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// How `merge` combines lines written for the same pattern and tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum MergeMode {
    Union,
    Override,
}

/// Kind of removal, matched against `finder:disable-*` annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum RemovalKind {
    Stale,
    Unused,
    Narrowing,
}

/// Tagged test expectations toolkit.
#[derive(Parser)]
#[command(name = "tagex", version, about = "Tagged test expectations toolkit")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log engine decisions to stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Path to a tagex.toml configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an expectation file and check it for conflicts
    Check {
        /// Path to the expectation file
        file: PathBuf,
        /// Comma-separated active tags to validate against the file
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Comma-separated tags accepted even when undeclared
        #[arg(long, value_delimiter = ',')]
        ignored_tags: Vec<String>,
    },

    /// Print the effective expectation of each test
    Query {
        /// Path to the expectation file
        file: PathBuf,
        /// Comma-separated tags of the configuration being resolved
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Comma-separated tags accepted even when undeclared
        #[arg(long, value_delimiter = ',')]
        ignored_tags: Vec<String>,
        /// Test names to resolve
        #[arg(required = true)]
        tests: Vec<String>,
    },

    /// List expectations that match none of the known tests
    Broken {
        /// Path to the expectation file
        file: PathBuf,
        /// File listing one known test name per line
        #[arg(long)]
        tests: PathBuf,
    },

    /// Merge two expectation files and print the result
    Merge {
        /// Base expectation file
        a: PathBuf,
        /// Expectation file merged into the base
        b: PathBuf,
        /// How lines for the same pattern and tags are combined
        #[arg(long, default_value = "union", value_enum)]
        mode: MergeMode,
    },

    /// Print a file without the expectations added within the grace period
    Recent {
        /// Path to the expectation file, inside a git checkout
        file: PathBuf,
        /// Grace period in days; negative disables filtering
        #[arg(long, allow_hyphen_values = true)]
        grace_days: Option<i64>,
    },

    /// Remove expectations from a file in place
    Remove {
        /// Path to the expectation file
        file: PathBuf,
        /// File holding the expectation lines to remove
        #[arg(long)]
        expectations: PathBuf,
        /// Kind of removal, checked against disable annotations
        #[arg(long = "type", default_value = "stale", value_enum)]
        removal_type: RemovalKind,
    },

    /// Narrow semi-stale expectations in place using build observations
    Narrow {
        /// Path to the expectation file
        file: PathBuf,
        /// JSON file of observations keyed by expectation line
        #[arg(long)]
        observations: PathBuf,
    },

    /// Print bug URLs that no expectation file mentions
    Orphans {
        /// Comma-separated bug URLs to look for
        #[arg(long, value_delimiter = ',', required = true)]
        bugs: Vec<String>,
        /// Expectation files to search; defaults to the configured list
        files: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Check {
            file,
            tags,
            ignored_tags,
        } => {
            let ignored = config.ignored_tags_with(ignored_tags);
            cmd_check(&file, &tags, &ignored, cli.output, cli.quiet);
        }
        Commands::Query {
            file,
            tags,
            ignored_tags,
            tests,
        } => {
            let ignored = config.ignored_tags_with(ignored_tags);
            cmd_query(&file, &tags, &ignored, &tests, cli.output, cli.quiet);
        }
        Commands::Broken { file, tests } => {
            cmd_broken(&file, &tests, cli.output, cli.quiet);
        }
        Commands::Merge { a, b, mode } => {
            cmd_merge(&a, &b, mode, cli.output, cli.quiet);
        }
        Commands::Recent { file, grace_days } => {
            let grace = grace_days.unwrap_or(config.grace_period_days);
            cmd_recent(&file, grace, cli.output, cli.quiet);
        }
        Commands::Remove {
            file,
            expectations,
            removal_type,
        } => {
            cmd_remove(&file, &expectations, removal_type, cli.output, cli.quiet);
        }
        Commands::Narrow { file, observations } => {
            let consolidator = config.consolidator();
            cmd_narrow(&file, &observations, &consolidator, cli.output, cli.quiet);
        }
        Commands::Orphans { bugs, files } => {
            let files = if files.is_empty() {
                config.expectation_files.clone()
            } else {
                files
            };
            cmd_orphans(&files, &bugs, cli.output, cli.quiet);
        }
    }
}

/// Install a stderr subscriber. `RUST_LOG` takes precedence over the
/// default level.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

/// Report `msg` and exit with status 1.
pub(crate) fn fail(msg: &str, output: OutputFormat, quiet: bool) -> ! {
    report_error(msg, output, quiet);
    process::exit(1);
}

/// Pretty-print a JSON value on stdout.
pub(crate) fn print_json(value: &serde_json::Value) {
    let pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    println!("{}", pretty);
}
