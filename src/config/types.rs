//! Configuration types, constants, and defaults for psyker.

use serde::{Deserialize, Serialize};

/// Config file looked up in the current directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "psyker.yaml";

/// Environment variable overriding the sandbox root.
pub const SANDBOX_ROOT_ENV: &str = "PSYKER_SANDBOX_ROOT";

/// Directory created under the home directory when no root is configured.
pub const DEFAULT_SANDBOX_DIR: &str = "psyker_sandbox";

/// The two shells task commands can run through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellKind {
    /// Used by `exec.ps`.
    PowerShell,
    /// Used by `exec.cmd`.
    Cmd,
}

impl std::fmt::Display for ShellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShellKind::PowerShell => write!(f, "powershell"),
            ShellKind::Cmd => write!(f, "cmd"),
        }
    }
}

/// Launcher command lines. The task's command string is appended as the
/// final argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    #[serde(default = "default_powershell")]
    pub powershell: String,

    #[serde(default = "default_cmd")]
    pub cmd: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            powershell: default_powershell(),
            cmd: default_cmd(),
        }
    }
}

pub fn default_powershell() -> String {
    "powershell -NoProfile -Command".to_string()
}

pub fn default_cmd() -> String {
    "cmd /c".to_string()
}
