//! Dialect selection and per-dialect vocabulary tables.

use crate::error::{PsykerError, Result, SourceSpan};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// One of the three file grammars sharing the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `.psy`: zero or more task definitions.
    Task,
    /// `.psyw`: exactly one worker definition.
    Worker,
    /// `.psya`: exactly one agent definition.
    Agent,
}

/// Vocabulary restrictions for one dialect.
#[derive(Debug)]
pub struct Grammar {
    /// Keywords owned by other dialects. Seeing one at a definition header or
    /// at the start of a body statement is a dialect error.
    pub foreign_keywords: &'static [&'static str],
    /// Hint attached to foreign-keyword errors raised inside a body.
    pub body_hint: &'static str,
}

const TASK_GRAMMAR: Grammar = Grammar {
    foreign_keywords: &["worker", "allow", "sandbox", "cwd", "agent", "use", "count"],
    body_hint: "Use task statements: fs.open, fs.create, exec.ps, exec.cmd.",
};

const WORKER_GRAMMAR: Grammar = Grammar {
    foreign_keywords: &[
        "task", "@access", "agents", "workers", "agent", "use", "count", "fs.open", "fs.create",
        "exec.ps", "exec.cmd",
    ],
    body_hint: "Use worker statements: sandbox, cwd, allow.",
};

const AGENT_GRAMMAR: Grammar = Grammar {
    foreign_keywords: &[
        "task", "@access", "agents", "workers", "worker", "allow", "sandbox", "cwd", "fs.open",
        "fs.create", "exec.ps", "exec.cmd",
    ],
    body_hint: "Use only 'use worker <name> count = <int>;'.",
};

impl Dialect {
    /// Select the dialect from a file's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        Self::from_extension(extension).ok_or_else(|| {
            let shown = if extension.is_empty() {
                String::new()
            } else {
                format!(".{}", extension)
            };
            PsykerError::dialect(format!("Unsupported file extension '{}'", shown))
                .at(SourceSpan::new(Some(path), 1, 1))
                .with_hint("Use .psy, .psyw, or .psya.")
        })
    }

    /// Extension without the leading dot.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "psy" => Some(Self::Task),
            "psyw" => Some(Self::Worker),
            "psya" => Some(Self::Agent),
            _ => None,
        }
    }

    /// Human-readable file kind used in diagnostics, e.g. `task files (.psy)`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Task => "task files (.psy)",
            Self::Worker => "worker files (.psyw)",
            Self::Agent => "agent files (.psya)",
        }
    }

    /// Position in directory load order: workers, then agents, then tasks,
    /// so agent references to workers resolve.
    pub fn load_order(self) -> u8 {
        match self {
            Self::Worker => 0,
            Self::Agent => 1,
            Self::Task => 2,
        }
    }

    pub fn grammar(self) -> &'static Grammar {
        match self {
            Self::Task => &TASK_GRAMMAR,
            Self::Worker => &WORKER_GRAMMAR,
            Self::Agent => &AGENT_GRAMMAR,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Task => "task",
            Self::Worker => "worker",
            Self::Agent => "agent",
        };
        f.write_str(name)
    }
}

impl Grammar {
    pub fn is_foreign(&self, keyword: &str) -> bool {
        self.foreign_keywords.contains(&keyword)
    }
}
