//! Implementation of the `psyker run` command.

use super::{Session, write_line};
use crate::cli::RunArgs;
use crate::error::Result;
use std::io::Write;

/// Run a task and print its captured output followed by a status line:
/// `status=<n> agent=<a> worker=<w> task=<t>`.
pub fn cmd_run(
    session: &mut Session,
    args: &RunArgs,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<()> {
    let result = session.runtime.run_task(&args.agent, &args.task)?;

    let stdout = result.stdout.trim_end_matches('\n');
    if !stdout.is_empty() {
        write_line(out, stdout)?;
    }
    let stderr = result.stderr.trim_end_matches('\n');
    if !stderr.is_empty() {
        write_line(err, stderr)?;
    }

    write_line(
        out,
        &format!(
            "status={} agent={} worker={} task={}",
            result.status_code, result.agent, result.worker, result.task
        ),
    )
}
