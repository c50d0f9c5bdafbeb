//! Command implementations for psyker.
//!
//! [`dispatch`] builds a [`Session`] from the global flags (config, sandbox,
//! runtime with `--defs` loaded) and routes the command to its handler.
//! Handlers write to the writers they are given so tests can capture output.

mod check;
mod inspect;
mod run;
mod sandbox;

#[cfg(test)]
mod tests;

use crate::cli::{Cli, Command, GlobalArgs, SandboxAction};
use crate::config::Config;
use crate::error::{PsykerError, Result};
use crate::runtime::Runtime;
use crate::sandbox::Sandbox;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Everything a command handler needs.
#[derive(Debug)]
pub struct Session {
    pub runtime: Runtime,
}

impl Session {
    /// Resolve config and sandbox, then load every `--defs` path in order.
    pub fn open(global: &GlobalArgs) -> Result<Self> {
        let config = Config::discover(global.config.as_deref())?;
        let sandbox = Sandbox::from_config(&config, global.sandbox.as_deref())?;
        debug!(root = %sandbox.root().display(), "sandbox resolved");

        let mut session = Self {
            runtime: Runtime::with_config(sandbox, config),
        };
        for path in &global.defs {
            session.load(path)?;
        }
        Ok(session)
    }

    /// Load one file, or every definition file in a directory.
    ///
    /// Returns the files that were loaded, in order.
    pub fn load(&mut self, path: &Path) -> Result<Vec<PathBuf>> {
        if path.is_dir() {
            self.runtime.load_dir(path)
        } else {
            self.runtime.load_file(path)?;
            Ok(vec![path.to_path_buf()])
        }
    }
}

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution.
pub fn dispatch(cli: Cli) -> Result<()> {
    let mut session = Session::open(&cli.global)?;
    let stdout = io::stdout();
    let stderr = io::stderr();
    run_command(&mut session, cli.command, &mut stdout.lock(), &mut stderr.lock())
}

/// Route an already-parsed command against an open session.
pub fn run_command(
    session: &mut Session,
    command: Command,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Check(args) => check::cmd_check(session, &args, out),
        Command::Ls(args) => inspect::cmd_ls(session, &args, out),
        Command::Stx(args) => inspect::cmd_stx(session, &args, out),
        Command::Run(args) => run::cmd_run(session, &args, out, err),
        Command::Sandbox(cmd) => match cmd.action {
            SandboxAction::Reset(args) => sandbox::cmd_reset(session, &args, out),
        },
    }
}

fn write_line(out: &mut dyn Write, text: &str) -> Result<()> {
    writeln!(out, "{}", text)
        .map_err(|e| PsykerError::general(format!("failed to write output: {}", e)))
}
