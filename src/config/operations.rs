//! Config loading, validation, and sandbox-root resolution.

use super::model::Config;
use super::types::{DEFAULT_CONFIG_FILE, DEFAULT_SANDBOX_DIR, SANDBOX_ROOT_ENV, ShellKind};
use crate::error::{PsykerError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            PsykerError::general(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        debug!(path = %path.display(), "loaded config file");
        Self::from_yaml(&content)
    }

    /// Load the config for a CLI invocation: the explicit `--config` file if
    /// given (it must exist), else `./psyker.yaml` if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            return Self::load(default_path);
        }

        Ok(Self::default())
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml).map_err(|e| {
            PsykerError::general(format!("failed to parse config YAML: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            PsykerError::general(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - each shell launcher must be non-empty and split into words
    /// - `sandbox_root` must not be empty when set
    pub fn validate(&self) -> Result<()> {
        for kind in [ShellKind::PowerShell, ShellKind::Cmd] {
            self.launcher(kind)?;
        }

        if let Some(root) = &self.sandbox_root
            && root.as_os_str().is_empty()
        {
            return Err(PsykerError::general(
                "config validation failed: sandbox_root must not be empty",
            ));
        }

        Ok(())
    }

    /// The launcher argv for a shell, split with shell-words.
    pub fn launcher(&self, kind: ShellKind) -> Result<Vec<String>> {
        let line = match kind {
            ShellKind::PowerShell => &self.shell.powershell,
            ShellKind::Cmd => &self.shell.cmd,
        };

        let words = shell_words::split(line).map_err(|e| {
            PsykerError::general(format!(
                "config validation failed: shell.{} launcher '{}' is not valid: {}",
                kind, line, e
            ))
        })?;

        if words.is_empty() {
            return Err(PsykerError::general(format!(
                "config validation failed: shell.{} launcher must not be empty",
                kind
            )));
        }

        Ok(words)
    }

    /// Pick the sandbox root, in order of precedence: `override_root` (the
    /// `--sandbox` flag), `PSYKER_SANDBOX_ROOT`, `sandbox_root` from the
    /// config, then `<home>/psyker_sandbox`.
    pub fn resolve_sandbox_root(&self, override_root: Option<&Path>) -> Result<PathBuf> {
        let env_root = std::env::var(SANDBOX_ROOT_ENV).ok();
        self.resolve_sandbox_root_with(override_root, env_root.as_deref(), home_dir())
    }

    /// [`Config::resolve_sandbox_root`] with the environment passed in.
    pub fn resolve_sandbox_root_with(
        &self,
        override_root: Option<&Path>,
        env_root: Option<&str>,
        home: Option<PathBuf>,
    ) -> Result<PathBuf> {
        let chosen = override_root
            .map(Path::to_path_buf)
            .or_else(|| env_root.filter(|s| !s.is_empty()).map(PathBuf::from))
            .or_else(|| self.sandbox_root.clone());

        match chosen {
            Some(path) => expand_home(&path, home.as_deref()),
            None => home
                .map(|h| h.join(DEFAULT_SANDBOX_DIR))
                .ok_or_else(missing_home_error),
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Expand a leading `~` component.
fn expand_home(path: &Path, home: Option<&Path>) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = home.ok_or_else(missing_home_error)?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

fn missing_home_error() -> PsykerError {
    PsykerError::general("cannot determine the home directory for the default sandbox root")
        .with_hint(format!(
            "Set {} or pass --sandbox <DIR>.",
            SANDBOX_ROOT_ENV
        ))
}
