//! Config struct definition and default implementation.

use super::types::ShellConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for psyker.
///
/// This struct represents the contents of `psyker.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sandbox root. `~` expands to the home directory. Overridden by
    /// `--sandbox` and by `PSYKER_SANDBOX_ROOT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_root: Option<PathBuf>,

    /// Shell launchers for `exec.ps` and `exec.cmd`.
    #[serde(default)]
    pub shell: ShellConfig,
}
