//! Sandbox root, path containment, and the operation log.
//!
//! Every path a task touches, and every subprocess working directory, is
//! resolved through [`Sandbox::resolve_under_root`] or
//! [`Sandbox::resolve_in_workspace`]. Containment is checked in two phases:
//!
//! 1. The lexically normalized path must sit under the root.
//! 2. The real path, with symlinks resolved in every existing component, must
//!    also sit under the real root.
//!
//! Phase 1 alone misses a symlink inside the sandbox that points outside it.
//! Phase 2 alone would accept `..` tricks through paths that do not exist yet.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── workspace/         default working directory for commands
//! ├── logs/psyker.log    operation log
//! └── tmp/               captured subprocess output
//! ```

use crate::config::Config;
use crate::error::{PsykerError, Result};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

#[cfg(test)]
mod tests;

pub const WORKSPACE_DIR: &str = "workspace";
pub const LOGS_DIR: &str = "logs";
pub const TMP_DIR: &str = "tmp";
pub const LOG_FILE: &str = "psyker.log";

/// A filesystem root that all task paths must stay inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Create a sandbox at `root`. A relative root is taken from the current
    /// directory. Nothing is created on disk until first use.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let absolute = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()
                .map_err(|e| {
                    PsykerError::general(format!("failed to read current directory: {}", e))
                })?
                .join(root)
        };
        Ok(Self {
            root: normalize_lexically(&absolute),
        })
    }

    /// Create a sandbox at the root chosen by `config`, with `override_root`
    /// (the `--sandbox` flag) taking precedence.
    pub fn from_config(config: &Config, override_root: Option<&Path>) -> Result<Self> {
        Self::new(config.resolve_sandbox_root(override_root)?)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workspace(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn logs(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    pub fn tmp(&self) -> PathBuf {
        self.root.join(TMP_DIR)
    }

    pub fn log_file(&self) -> PathBuf {
        self.logs().join(LOG_FILE)
    }

    /// Create the root and its `workspace`, `logs` and `tmp` directories.
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [self.workspace(), self.logs(), self.tmp()] {
            create_dir(&dir)?;
        }
        Ok(())
    }

    /// Resolve an absolute or root-relative path and check containment.
    pub fn resolve_under_root(&self, value: &str) -> Result<PathBuf> {
        self.resolve_from(&self.root, value)
    }

    /// Resolve an absolute or workspace-relative path and check containment.
    pub fn resolve_in_workspace(&self, value: &str) -> Result<PathBuf> {
        self.resolve_from(&self.workspace(), value)
    }

    /// Recreate `workspace` and `tmp` empty, and `logs` too when `clear_logs`
    /// is set. Returns the directories that were cleared.
    pub fn reset(&self, clear_logs: bool) -> Result<Vec<PathBuf>> {
        self.ensure_layout()?;

        let mut cleared = vec![self.workspace(), self.tmp()];
        if clear_logs {
            cleared.push(self.logs());
        }

        for dir in &cleared {
            fs::remove_dir_all(dir).map_err(|e| {
                PsykerError::general(format!(
                    "failed to clear sandbox directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
            create_dir(dir)?;
        }

        debug!(root = %self.root.display(), clear_logs, "sandbox reset");
        Ok(cleared)
    }

    /// Append one line to the operation log:
    /// `<timestamp>\tagent=<a>\tworker=<w>\top=<op>\tstatus=<s>`.
    pub fn log(&self, agent: &str, worker: &str, operation: &str, status: &str) -> Result<()> {
        let log_file = self.log_file();
        create_dir(&self.logs())?;

        let line = format!(
            "{}\tagent={}\tworker={}\top={}\tstatus={}",
            Utc::now().to_rfc3339(),
            agent,
            worker,
            operation,
            status
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| {
                PsykerError::general(format!(
                    "failed to open log file '{}': {}",
                    log_file.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", line).map_err(|e| {
            PsykerError::general(format!(
                "failed to write log file '{}': {}",
                log_file.display(),
                e
            ))
        })
    }

    fn resolve_from(&self, base: &Path, value: &str) -> Result<PathBuf> {
        self.ensure_layout()?;

        let candidate = Path::new(value);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            base.join(candidate)
        };
        let lexical = normalize_lexically(&joined);
        let real_root = real_path(&self.root)?;

        // Phase 1: textual containment.
        if !lexical.starts_with(&self.root) && !lexical.starts_with(&real_root) {
            return Err(PsykerError::sandbox(format!(
                "Path '{}' is outside sandbox root '{}'",
                lexical.display(),
                self.root.display()
            ))
            .with_hint("Use a path inside the sandbox."));
        }

        // Phase 2: containment after following symlinks.
        let real = real_path(&lexical)?;
        if !real.starts_with(&real_root) {
            return Err(PsykerError::sandbox(format!(
                "Symlink target '{}' escapes sandbox root '{}'",
                real.display(),
                real_root.display()
            ))
            .with_hint("Use paths that resolve inside the sandbox root."));
        }

        Ok(real)
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        PsykerError::general(format!(
            "failed to create directory '{}': {}",
            dir.display(),
            e
        ))
    })
}

/// Resolve `.` and `..` without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push(component);
                }
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component);
            }
        }
    }
    normalized
}

/// Symlink hops followed through dangling links before giving up.
const MAX_LINK_DEPTH: usize = 40;

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// part that does not exist yet. `path` must already be normalized.
///
/// A dangling symlink is followed to its target, so a link to a location
/// outside the root that does not exist yet still resolves outside.
fn real_path(path: &Path) -> Result<PathBuf> {
    real_path_at_depth(path, 0)
}

fn real_path_at_depth(path: &Path, depth: usize) -> Result<PathBuf> {
    if depth > MAX_LINK_DEPTH {
        return Err(PsykerError::sandbox(format!(
            "Too many levels of symbolic links resolving '{}'",
            path.display()
        ))
        .with_hint("Remove the symlink loop inside the sandbox."));
    }

    let mut existing = path;
    let mut missing = Vec::new();

    let mut real = loop {
        if let Ok(real) = existing.canonicalize() {
            break real;
        }

        if let Ok(target) = fs::read_link(existing) {
            // A relative target is resolved from the link's real directory.
            let target = match existing.parent() {
                Some(parent) if target.is_relative() => parent
                    .canonicalize()
                    .unwrap_or_else(|_| parent.to_path_buf())
                    .join(target),
                _ => target,
            };
            break real_path_at_depth(&normalize_lexically(&target), depth + 1)?;
        }

        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(path.to_path_buf()),
        }
    };

    for name in missing.iter().rev() {
        real.push(name);
    }
    Ok(real)
}
