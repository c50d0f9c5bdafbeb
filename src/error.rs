//! Error types for psyker.
//!
//! Every failure the core can report belongs to one of a small set of kinds.
//! Each kind carries the same [`Diagnostic`] payload: a message, an optional
//! source location, an optional remediation hint, and (for execution failures)
//! the agent/worker/task the run was resolved to.

use crate::exit_codes;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Message prefix used when a run stops because the cancel predicate fired.
pub const CANCELLED_MESSAGE: &str = "task cancelled by user";

/// A position in a source file. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSpan {
    pub path: Option<PathBuf>,
    pub line: usize,
    pub column: usize,
}

impl SourceSpan {
    pub fn new(path: Option<&Path>, line: usize, column: usize) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
            line,
            column,
        }
    }
}

/// Identity of the run an execution failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunIdentity {
    pub agent: String,
    /// `None` when the failure happened before a worker was selected.
    pub worker: Option<String>,
    pub task: String,
}

/// Payload shared by every error kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Option<SourceSpan>,
    pub hint: Option<String>,
    pub run: Option<RunIdentity>,
}

impl Diagnostic {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
            hint: None,
            run: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Main error type for psyker operations.
///
/// `Access` is the allow-list flavour of `Permission`; use
/// [`PsykerError::is_permission`] to treat them alike.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PsykerError {
    /// Usage errors and failures outside the language taxonomy.
    #[error("{0}")]
    General(Diagnostic),

    /// Malformed tokens or grammar violation.
    #[error("{0}")]
    Syntax(Diagnostic),

    /// Construct from another dialect, or unsupported file extension.
    #[error("{0}")]
    Dialect(Diagnostic),

    /// Unknown name or invalid count.
    #[error("{0}")]
    Reference(Diagnostic),

    /// Task allow-list denial.
    #[error("{0}")]
    Access(Diagnostic),

    /// Worker lacks the capability a statement needs.
    #[error("{0}")]
    Permission(Diagnostic),

    /// A resolved path escapes the sandbox root.
    #[error("{0}")]
    Sandbox(Diagnostic),

    /// Missing file, failed subprocess, or cancellation.
    #[error("{0}")]
    Exec(Diagnostic),
}

impl PsykerError {
    pub fn general(message: impl Into<String>) -> Self {
        Self::General(Diagnostic::new(message))
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(Diagnostic::new(message))
    }

    pub fn dialect(message: impl Into<String>) -> Self {
        Self::Dialect(Diagnostic::new(message))
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::Reference(Diagnostic::new(message))
    }

    pub fn access(message: impl Into<String>) -> Self {
        Self::Access(Diagnostic::new(message))
    }

    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission(Diagnostic::new(message))
    }

    pub fn sandbox(message: impl Into<String>) -> Self {
        Self::Sandbox(Diagnostic::new(message))
    }

    pub fn exec(message: impl Into<String>) -> Self {
        Self::Exec(Diagnostic::new(message))
    }

    /// The error raised when the cancel predicate stops a run.
    pub fn cancelled() -> Self {
        Self::exec(CANCELLED_MESSAGE)
    }

    /// Attach a source location.
    pub fn at(mut self, span: SourceSpan) -> Self {
        self.diagnostic_mut().span = Some(span);
        self
    }

    /// Attach a source location unless one is already present.
    pub fn at_if_missing(mut self, span: SourceSpan) -> Self {
        let diagnostic = self.diagnostic_mut();
        if diagnostic.span.is_none() {
            diagnostic.span = Some(span);
        }
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.diagnostic_mut().hint = Some(hint.into());
        self
    }

    /// Attach the identity of the run this error stopped. An identity that is
    /// already present is kept.
    pub fn with_run(mut self, run: RunIdentity) -> Self {
        let diagnostic = self.diagnostic_mut();
        if diagnostic.run.is_none() {
            diagnostic.run = Some(run);
        }
        self
    }

    /// Fill in the span's path when the error was raised without one.
    pub fn with_path_fallback(mut self, path: &Path) -> Self {
        if let Some(span) = self.diagnostic_mut().span.as_mut()
            && span.path.is_none()
        {
            span.path = Some(path.to_path_buf());
        }
        self
    }

    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            Self::General(d)
            | Self::Syntax(d)
            | Self::Dialect(d)
            | Self::Reference(d)
            | Self::Access(d)
            | Self::Permission(d)
            | Self::Sandbox(d)
            | Self::Exec(d) => d,
        }
    }

    fn diagnostic_mut(&mut self) -> &mut Diagnostic {
        match self {
            Self::General(d)
            | Self::Syntax(d)
            | Self::Dialect(d)
            | Self::Reference(d)
            | Self::Access(d)
            | Self::Permission(d)
            | Self::Sandbox(d)
            | Self::Exec(d) => d,
        }
    }

    pub fn message(&self) -> &str {
        &self.diagnostic().message
    }

    pub fn span(&self) -> Option<&SourceSpan> {
        self.diagnostic().span.as_ref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.diagnostic().hint.as_deref()
    }

    pub fn run(&self) -> Option<&RunIdentity> {
        self.diagnostic().run.as_ref()
    }

    /// Name of the error kind as shown in rendered diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::General(_) => "PsykerError",
            Self::Syntax(_) => "SyntaxError",
            Self::Dialect(_) => "DialectError",
            Self::Reference(_) => "ReferenceError",
            Self::Access(_) => "AccessError",
            Self::Permission(_) => "PermissionError",
            Self::Sandbox(_) => "SandboxError",
            Self::Exec(_) => "ExecError",
        }
    }

    /// True for both capability and allow-list denials.
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::Permission(_) | Self::Access(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Exec(d) if d.message.to_lowercase().starts_with(CANCELLED_MESSAGE))
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Syntax(_) | Self::Dialect(_) => exit_codes::SYNTAX_FAILURE,
            Self::Access(_) | Self::Permission(_) => exit_codes::ACCESS_DENIED,
            Self::Sandbox(_) => exit_codes::SANDBOX_VIOLATION,
            Self::Exec(_) if self.is_cancelled() => exit_codes::CANCELLED,
            Self::Exec(_) => exit_codes::EXEC_FAILURE,
            Self::Reference(_) | Self::General(_) => exit_codes::GENERAL_ERROR,
        }
    }

    /// Render the error the way the CLI prints it.
    ///
    /// ```text
    /// error[SyntaxError]: Expected ';', got '}'
    ///   --> tasks.psy:3:1
    ///   hint: Check punctuation and delimiters.
    /// ```
    pub fn to_diagnostic(&self) -> String {
        let diagnostic = self.diagnostic();
        let mut out = format!("error[{}]: {}", self.kind_name(), diagnostic.message);
        if let Some(span) = &diagnostic.span
            && let Some(path) = &span.path
        {
            out.push_str(&format!(
                "\n  --> {}:{}:{}",
                path.display(),
                span.line,
                span.column
            ));
        }
        if let Some(hint) = &diagnostic.hint {
            out.push_str(&format!("\n  hint: {}", hint));
        }
        out
    }
}

/// Result type alias for psyker operations.
pub type Result<T> = std::result::Result<T, PsykerError>;
