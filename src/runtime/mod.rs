//! Runtime: definition registries, the load pipeline, and task execution.
//!
//! A [`Runtime`] is single-threaded state. Registries and the round-robin
//! counters are never locked; a host that loads or runs from several threads
//! must serialize those calls itself. Only the cancel predicate may be
//! flipped from elsewhere, through a [`CancelFlag`] or any `Send + Sync`
//! closure.

mod cancel;
mod engine;
mod load;
mod process;
mod registry;


pub use cancel::{CancelCheck, CancelFlag};
pub use engine::ExecutionResult;
pub use load::definition_files;
pub use registry::Registries;

use crate::config::Config;
use crate::sandbox::Sandbox;
use std::collections::HashMap;
use std::sync::Arc;

/// Owns the loaded definitions and executes tasks against a sandbox.
pub struct Runtime {
    /// Live registries. Loads build a new value and swap the `Arc`, so a
    /// snapshot taken with [`Runtime::snapshot`] never changes under a reader.
    registries: Arc<Registries>,
    sandbox: Sandbox,
    config: Config,
    /// Next pool index per agent name. Survives agent reloads.
    rr_index: HashMap<String, u64>,
    cancel_check: Option<CancelCheck>,
}

impl Runtime {
    /// A runtime with default shell launchers.
    pub fn new(sandbox: Sandbox) -> Self {
        Self::with_config(sandbox, Config::default())
    }

    pub fn with_config(sandbox: Sandbox, config: Config) -> Self {
        Self {
            registries: Arc::new(Registries::default()),
            sandbox,
            config,
            rr_index: HashMap::new(),
            cancel_check: None,
        }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// A shared handle to the current registries.
    pub fn snapshot(&self) -> Arc<Registries> {
        Arc::clone(&self.registries)
    }

    /// Install the predicate polled before each statement and while a
    /// subprocess runs. Replaces any previous predicate.
    pub fn set_cancel_check<F>(&mut self, check: F)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.cancel_check = Some(Box::new(check));
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_check.as_ref().is_some_and(|check| check())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("registries", &self.registries)
            .field("sandbox", &self.sandbox)
            .field("config", &self.config)
            .field("rr_index", &self.rr_index)
            .field("cancel_check", &self.cancel_check.is_some())
            .finish()
    }
}
