//! Task execution engine.
//!
//! A run moves through `select worker -> check access -> execute statements`.
//! Any failed check ends the run; no statement after the failing one runs.

use super::Runtime;
use super::process::run_shell;
use crate::ast::{AgentDef, Capability, TaskDef, TaskStmt, WorkerDef};
use crate::config::ShellKind;
use crate::error::{PsykerError, Result, RunIdentity, SourceSpan};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub agent: String,
    pub worker: String,
    pub task: String,
}

const STATUS_OK: &str = "ok";
const STATUS_ERROR: &str = "error";

impl Runtime {
    /// Run `task_name` on behalf of `agent_name`.
    ///
    /// Every error returned after the names are known carries the run's
    /// agent, task and (once selected) worker.
    pub fn run_task(&mut self, agent_name: &str, task_name: &str) -> Result<ExecutionResult> {
        let mut run = RunIdentity {
            agent: agent_name.to_string(),
            worker: None,
            task: task_name.to_string(),
        };

        match self.execute(&mut run) {
            Ok(result) => {
                info!(
                    agent = %result.agent,
                    worker = %result.worker,
                    task = %result.task,
                    "task completed"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(
                    agent = %run.agent,
                    worker = run.worker.as_deref().unwrap_or("-"),
                    task = %run.task,
                    kind = err.kind_name(),
                    error = %err,
                    "task failed"
                );
                Err(err.with_run(run))
            }
        }
    }

    fn execute(&mut self, run: &mut RunIdentity) -> Result<ExecutionResult> {
        let registries = Arc::clone(&self.registries);

        let agent = registries.agent(&run.agent).ok_or_else(|| {
            PsykerError::reference(format!("Unknown agent '{}'", run.agent))
                .with_hint("Load the agent definition (.psya) first.")
        })?;
        let task = registries.task(&run.task).ok_or_else(|| {
            PsykerError::reference(format!("Unknown task '{}'", run.task))
                .with_hint("Load the task definition (.psy) first.")
        })?;

        let worker_name = self.select_worker(agent)?;
        run.worker = Some(worker_name.clone());
        let worker = registries.worker(&worker_name).ok_or_else(|| {
            PsykerError::reference(format!(
                "Agent '{}' references unknown worker '{}'",
                agent.name, worker_name
            ))
            .with_hint("Load the worker definition, then reload the agent.")
        })?;

        check_access(task, &agent.name, &worker.name)?;

        let mut result = ExecutionResult {
            status_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            agent: agent.name.clone(),
            worker: worker.name.clone(),
            task: task.name.clone(),
        };

        for stmt in &task.statements {
            if !worker.has_capability(stmt.op) {
                return Err(PsykerError::permission(format!(
                    "Worker '{}' lacks capability '{}' required by task '{}'",
                    worker.name, stmt.op, task.name
                ))
                .at(statement_span(task, stmt))
                .with_hint(format!(
                    "Add 'allow {};' to worker '{}'.",
                    stmt.op, worker.name
                )));
            }

            if self.is_cancelled() {
                return Err(PsykerError::cancelled().at(statement_span(task, stmt)));
            }

            debug!(op = %stmt.op, arg = %stmt.arg, worker = %worker.name, "dispatching statement");
            let outcome = self.dispatch(stmt, worker, &mut result);
            let status = if outcome.is_ok() { STATUS_OK } else { STATUS_ERROR };
            let logged = self
                .sandbox
                .log(&agent.name, &worker.name, stmt.op.as_str(), status);

            outcome.map_err(|e| e.at_if_missing(statement_span(task, stmt)))?;
            logged?;
        }

        Ok(result)
    }

    /// Pick the next worker from the agent's pool and advance its counter.
    ///
    /// The counter moves even if the run is later denied.
    fn select_worker(&mut self, agent: &AgentDef) -> Result<String> {
        let total = agent.worker_instances();
        if total == 0 {
            return Err(PsykerError::reference(format!(
                "Agent '{}' has no workers",
                agent.name
            ))
            .with_hint("Add 'use worker <name> count = <int>;' to the agent."));
        }

        let index = self.rr_index.get(&agent.name).copied().unwrap_or(0);
        let slot = index % total;
        let selected = agent.worker_at(slot).map(str::to_string).ok_or_else(|| {
            PsykerError::reference(format!("Agent '{}' has no worker at slot {}", agent.name, slot))
        })?;
        self.rr_index.insert(agent.name.clone(), (slot + 1) % total);
        Ok(selected)
    }

    fn dispatch(
        &self,
        stmt: &TaskStmt,
        worker: &WorkerDef,
        result: &mut ExecutionResult,
    ) -> Result<()> {
        match stmt.op {
            Capability::FsOpen => {
                let path = self.sandbox.resolve_under_root(&stmt.arg)?;
                result.stdout.push_str(&read_file(&path)?);
                Ok(())
            }
            Capability::FsCreate => {
                let path = self.sandbox.resolve_under_root(&stmt.arg)?;
                create_path(&path)
            }
            Capability::ExecPs => self.exec(ShellKind::PowerShell, stmt, worker, result),
            Capability::ExecCmd => self.exec(ShellKind::Cmd, stmt, worker, result),
        }
    }

    fn exec(
        &self,
        shell: ShellKind,
        stmt: &TaskStmt,
        worker: &WorkerDef,
        result: &mut ExecutionResult,
    ) -> Result<()> {
        let cwd = match &worker.cwd {
            Some(cwd) => self.sandbox.resolve_under_root(cwd)?,
            None => self.sandbox.resolve_in_workspace(".")?,
        };
        fs::create_dir_all(&cwd).map_err(|e| {
            PsykerError::exec(format!(
                "failed to create working directory '{}': {}",
                cwd.display(),
                e
            ))
        })?;

        let launcher = self.config.launcher(shell)?;
        let output = run_shell(
            &launcher,
            &stmt.arg,
            &cwd,
            &self.sandbox.tmp(),
            &|| self.is_cancelled(),
        )?;

        if output.cancelled {
            return Err(PsykerError::cancelled());
        }

        if !output.is_success() {
            let message = match output.exit_code {
                Some(code) => format!("Command failed with exit code {}: {}", code, stmt.arg),
                None => format!("Command terminated by a signal: {}", stmt.arg),
            };
            return Err(PsykerError::exec(message)
                .with_hint(captured_output_hint(&output.stdout, &output.stderr)));
        }

        result.stdout.push_str(&output.stdout);
        result.stderr.push_str(&output.stderr);
        Ok(())
    }
}

/// Both access axes must pass. A task without `@access` is always denied.
fn check_access(task: &TaskDef, agent: &str, worker: &str) -> Result<()> {
    let Some(access) = &task.access else {
        return Err(PsykerError::access(format!(
            "Task '{}' has no @access block; access denied",
            task.name
        ))
        .with_hint("Add '@access { agents: [...] }' before the task definition."));
    };

    if !access.permits_agent(agent) {
        return Err(PsykerError::access(format!(
            "Agent '{}' is not allowed to run task '{}'",
            agent, task.name
        ))
        .with_hint(format!("Add '{}' to the task's @access agents list.", agent)));
    }

    if !access.permits_worker(worker) {
        return Err(PsykerError::access(format!(
            "Worker '{}' is not allowed to run task '{}'",
            worker, task.name
        ))
        .with_hint(format!("Add '{}' to the task's @access workers list.", worker)));
    }

    Ok(())
}

fn statement_span(task: &TaskDef, stmt: &TaskStmt) -> SourceSpan {
    SourceSpan::new(task.source_path.as_deref(), stmt.line, stmt.column)
}

fn read_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(PsykerError::exec(format!(
            "File not found: '{}'",
            path.display()
        ))
        .with_hint("Create the file inside the sandbox, or fix the path."));
    }
    fs::read_to_string(path).map_err(|e| {
        PsykerError::exec(format!("failed to read '{}': {}", path.display(), e))
    })
}

/// A path with an extension is touched as a file; anything else is created
/// as a directory.
fn create_path(path: &Path) -> Result<()> {
    let failed = |e: std::io::Error| {
        PsykerError::exec(format!("failed to create '{}': {}", path.display(), e))
    };

    if path.extension().is_none() {
        return fs::create_dir_all(path).map_err(failed);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(failed)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(failed)
}

fn captured_output_hint(stdout: &str, stderr: &str) -> String {
    let mut parts = Vec::new();
    if !stdout.trim().is_empty() {
        parts.push(format!("stdout: {}", stdout.trim()));
    }
    if !stderr.trim().is_empty() {
        parts.push(format!("stderr: {}", stderr.trim()));
    }
    if parts.is_empty() {
        "The command produced no output.".to_string()
    } else {
        parts.join("\n")
    }
}
