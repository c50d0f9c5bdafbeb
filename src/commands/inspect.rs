//! Implementation of the `psyker ls` and `psyker stx` commands.
//!
//! Both render the loaded registries; neither touches the sandbox.

use super::{Session, write_line};
use crate::cli::{DefinitionKind, ListKind, LsArgs, OutputFormat, StxArgs};
use crate::error::{PsykerError, Result};
use serde_json::Value;
use std::io::Write;

pub fn cmd_ls(session: &mut Session, args: &LsArgs, out: &mut dyn Write) -> Result<()> {
    let registries = session.runtime.registries();
    let table = match args.kind {
        ListKind::Workers => render_table(
            &["name", "type", "capabilities"],
            registries
                .workers()
                .values()
                .map(|w| vec![w.name.clone(), "worker".into(), w.allows.len().to_string()])
                .collect(),
        ),
        ListKind::Agents => render_table(
            &["name", "type", "worker_instances"],
            registries
                .agents()
                .values()
                .map(|a| vec![a.name.clone(), "agent".into(), a.worker_instances().to_string()])
                .collect(),
        ),
        ListKind::Tasks => render_table(
            &["name", "type", "statements"],
            registries
                .tasks()
                .values()
                .map(|t| vec![t.name.clone(), "task".into(), t.statements.len().to_string()])
                .collect(),
        ),
    };
    write_line(out, &table)
}

pub fn cmd_stx(session: &mut Session, args: &StxArgs, out: &mut dyn Write) -> Result<()> {
    let value = inspect(session, args.kind, &args.name)?;

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&value).map_err(|e| {
                PsykerError::general(format!("failed to serialize '{}': {}", args.name, e))
            })?;
            write_line(out, &json)
        }
        OutputFormat::Table => {
            let rows = match &value {
                Value::Object(fields) => fields
                    .iter()
                    .map(|(key, field)| vec![key.clone(), format_value(field)])
                    .collect(),
                other => vec![vec!["value".to_string(), format_value(other)]],
            };
            write_line(out, &render_table(&["field", "value"], rows))
        }
    }
}

/// Serialize one definition, or fail if it is not loaded.
fn inspect(session: &Session, kind: DefinitionKind, name: &str) -> Result<Value> {
    let registries = session.runtime.registries();
    let value = match kind {
        DefinitionKind::Worker => registries.worker(name).map(serde_json::to_value),
        DefinitionKind::Agent => registries.agent(name).map(serde_json::to_value),
        DefinitionKind::Task => registries.task(name).map(serde_json::to_value),
    };

    let Some(value) = value else {
        return Err(PsykerError::general(format!("Unknown {} '{}'", kind_label(kind), name))
            .with_hint("Load its definition with --defs <PATH>."));
    };
    value.map_err(|e| PsykerError::general(format!("failed to serialize '{}': {}", name, e)))
}

fn kind_label(kind: DefinitionKind) -> &'static str {
    match kind {
        DefinitionKind::Worker => "worker",
        DefinitionKind::Agent => "agent",
        DefinitionKind::Task => "task",
    }
}

/// Scalars print bare, `null` for absent values, nested values as compact JSON.
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}

/// Left-aligned columns separated by ` | `, a `-+-` divider under the
/// header, and `(empty)` when there are no rows.
pub(crate) fn render_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return "(empty)".to_string();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render_row = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(headers.to_vec()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &rows {
        lines.push(render_row(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}
