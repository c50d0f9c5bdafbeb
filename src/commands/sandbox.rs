//! Implementation of the `psyker sandbox reset` command.

use super::{Session, write_line};
use crate::cli::SandboxResetArgs;
use crate::error::Result;
use std::io::Write;

pub fn cmd_reset(session: &mut Session, args: &SandboxResetArgs, out: &mut dyn Write) -> Result<()> {
    let cleared = session.runtime.sandbox().reset(args.logs)?;
    let names: Vec<String> = cleared
        .iter()
        .filter_map(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    write_line(out, &format!("sandbox reset: {} cleared", join_names(&names)))
}

/// `a`, `a and b`, `a, b, and c`.
fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{} and {}", first, second),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}
