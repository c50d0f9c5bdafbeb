use crate::config::{Config, ShellConfig};
use crate::runtime::Runtime;
use crate::sandbox::Sandbox;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Sets an environment variable for the life of the guard.
pub(crate) struct EnvGuard {
    key: &'static str,
    original: Option<OsString>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    pub(crate) fn set(key: &'static str, value: &str) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::var_os(key);
        // SAFETY: ENV_LOCK and #[serial] keep other tests from touching the
        // environment concurrently.
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            original,
            _lock: lock,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: see `EnvGuard::set`.
        unsafe {
            match &self.original {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }
}

/// Shell launchers that exist on the test host. Both dialect shells map to
/// the platform's native shell.
pub(crate) fn test_config() -> Config {
    let native = if cfg!(windows) { "cmd /c" } else { "sh -c" };
    Config {
        sandbox_root: None,
        shell: ShellConfig {
            powershell: native.to_string(),
            cmd: native.to_string(),
        },
    }
}

pub(crate) fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// A runtime over a fresh sandbox, with definition files kept in a sibling
/// `defs/` directory.
pub(crate) struct TestRuntime {
    pub temp_dir: TempDir,
    pub runtime: Runtime,
}

impl TestRuntime {
    pub(crate) fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let sandbox = Sandbox::new(temp_dir.path().join("sandbox")).unwrap();
        let runtime = Runtime::with_config(sandbox, test_config());
        Self { temp_dir, runtime }
    }

    /// Write each `(file name, source)` pair and load it, in order.
    pub(crate) fn with_defs(defs: &[(&str, &str)]) -> Self {
        let mut test = Self::new();
        for (name, source) in defs {
            let path = test.write_def(name, source);
            test.runtime.load_file(&path).unwrap();
        }
        test
    }

    pub(crate) fn defs_dir(&self) -> PathBuf {
        self.temp_dir.path().join("defs")
    }

    pub(crate) fn write_def(&self, name: &str, source: &str) -> PathBuf {
        write_file(&self.defs_dir(), name, source)
    }

    pub(crate) fn sandbox(&self) -> &Sandbox {
        self.runtime.sandbox()
    }
}
