//! Cross-reference validation for parsed documents.
//!
//! Parsing checks each file in isolation. Validation checks a document against
//! the definitions already loaded:
//! - every `use worker <name>` in an agent names a loaded worker
//! - every worker count is at least one
//!
//! Task and worker documents have no outgoing references and always pass.

use crate::ast::{AgentDef, Document, WorkerDef};
use crate::error::{PsykerError, Result, SourceSpan};
use std::collections::BTreeMap;

/// Read-only view of the registries a document is checked against.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub workers: &'a BTreeMap<String, WorkerDef>,
}

/// Validate a document. The first failing clause, in source order, wins.
pub fn validate_document(document: &Document, context: &ValidationContext<'_>) -> Result<()> {
    match document {
        Document::Tasks(_) | Document::Worker(_) => Ok(()),
        Document::Agent(doc) => validate_agent(&doc.agent, context),
    }
}

fn validate_agent(agent: &AgentDef, context: &ValidationContext<'_>) -> Result<()> {
    for usage in &agent.uses {
        let span = SourceSpan::new(agent.source_path.as_deref(), usage.line, usage.column);

        if !context.workers.contains_key(&usage.worker_name) {
            return Err(PsykerError::reference(format!(
                "Agent '{}' references unknown worker '{}'",
                agent.name, usage.worker_name
            ))
            .at(span)
            .with_hint("Load the worker definition before loading this agent."));
        }

        if usage.count == 0 {
            return Err(PsykerError::reference(format!(
                "Agent '{}' has invalid worker count {}",
                agent.name, usage.count
            ))
            .at(span)
            .with_hint("Use a worker count greater than zero."));
        }
    }
    Ok(())
}
