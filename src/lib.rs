//! Psyker: a three-dialect definition language for sandboxed task execution.
//!
//! Task files (`.psy`) describe what to do, worker files (`.psyw`) grant
//! capabilities, and agent files (`.psya`) pool workers. Definitions are
//! lexed, parsed per dialect, validated against what is already loaded and
//! committed atomically into a [`runtime::Runtime`], which runs tasks
//! inside a [`sandbox::Sandbox`].

pub mod ast;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod runtime;
pub mod sandbox;
pub mod token;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{PsykerError, Result};
