//! CLI argument parsing for psyker.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; the handlers live in the
//! `commands` module.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Psyker: load task, worker and agent definitions and run tasks inside a
/// sandbox.
///
/// Definitions come in three dialects:
/// - `.psy` task files
/// - `.psyw` worker files
/// - `.psya` agent files
#[derive(Parser, Debug)]
#[command(name = "psyker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Sandbox root directory. Overrides PSYKER_SANDBOX_ROOT and the config file.
    #[arg(long, global = true, value_name = "DIR")]
    pub sandbox: Option<PathBuf>,

    /// Configuration file (default: ./psyker.yaml when present).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Definition file or directory to load before the command runs.
    /// May be repeated; loads happen in the order given.
    #[arg(long = "defs", global = true, value_name = "PATH")]
    pub defs: Vec<PathBuf>,

    /// Emit debug diagnostics on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands for psyker.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load definition files and report each one accepted.
    ///
    /// Directories load workers, then agents, then tasks. The first
    /// rejected file stops the command.
    Check(CheckArgs),

    /// List loaded definitions of one kind.
    Ls(LsArgs),

    /// Inspect a single loaded definition.
    Stx(StxArgs),

    /// Run a task on behalf of an agent.
    ///
    /// The agent's next worker is chosen round-robin, then access and
    /// capabilities are checked before any statement runs.
    Run(RunArgs),

    /// Sandbox maintenance commands.
    Sandbox(SandboxCommand),
}

/// Arguments for the `check` command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Definition files or directories, loaded in order.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

/// Definition kinds listed by `ls`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Workers,
    Agents,
    Tasks,
}

/// Arguments for the `ls` command.
#[derive(Parser, Debug)]
pub struct LsArgs {
    #[arg(value_enum)]
    pub kind: ListKind,
}

/// Definition kinds inspected by `stx`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Worker,
    Agent,
    Task,
}

/// Output format for `stx`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Arguments for the `stx` command.
#[derive(Parser, Debug)]
pub struct StxArgs {
    #[arg(value_enum)]
    pub kind: DefinitionKind,

    /// Definition name.
    pub name: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Agent to act as.
    pub agent: String,

    /// Task to run.
    pub task: String,
}

/// Sandbox subcommands.
#[derive(Parser, Debug)]
pub struct SandboxCommand {
    #[command(subcommand)]
    pub action: SandboxAction,
}

/// Available sandbox actions.
#[derive(Subcommand, Debug)]
pub enum SandboxAction {
    /// Empty the sandbox workspace and tmp directories.
    Reset(SandboxResetArgs),
}

/// Arguments for the `sandbox reset` command.
#[derive(Parser, Debug)]
pub struct SandboxResetArgs {
    /// Also clear the operation log directory.
    #[arg(long)]
    pub logs: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
