//! Implementation of the `psyker check` command.

use super::{Session, write_line};
use crate::cli::CheckArgs;
use crate::error::Result;
use std::io::Write;

/// Load each path in order, printing `loaded: <file>` for every file
/// committed. The first rejected file ends the command with its error.
pub fn cmd_check(session: &mut Session, args: &CheckArgs, out: &mut dyn Write) -> Result<()> {
    for path in &args.paths {
        for loaded in session.load(path)? {
            write_line(out, &format!("loaded: {}", loaded.display()))?;
        }
    }
    Ok(())
}
