//! Exit code constants for the psyker CLI.
//!
//! - 0: Success
//! - 1: General error (bad args, unknown reference, unreadable input)
//! - 2: Syntax or dialect error in a source file
//! - 3: Access or permission denial
//! - 4: Sandbox containment violation
//! - 5: Execution failure (missing file, subprocess failure)
//! - 130: Task cancelled by the user

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error: bad arguments, unknown names, unreadable files.
pub const GENERAL_ERROR: i32 = 1;

/// Source file failed to lex or parse, or used another dialect's constructs.
pub const SYNTAX_FAILURE: i32 = 2;

/// Task allow-list denial or missing worker capability.
pub const ACCESS_DENIED: i32 = 3;

/// A resolved path escaped the sandbox root.
pub const SANDBOX_VIOLATION: i32 = 4;

/// A statement failed while executing.
pub const EXEC_FAILURE: i32 = 5;

/// The run was cancelled before finishing (128 + SIGINT).
pub const CANCELLED: i32 = 130;
