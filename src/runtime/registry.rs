//! The three definition registries.

use crate::ast::{AgentDef, Document, TaskDef, WorkerDef};
use crate::validate::ValidationContext;
use serde::Serialize;
use std::collections::BTreeMap;

/// Loaded definitions keyed by name. Later loads replace same-named entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Registries {
    workers: BTreeMap<String, WorkerDef>,
    agents: BTreeMap<String, AgentDef>,
    tasks: BTreeMap<String, TaskDef>,
}

impl Registries {
    pub fn workers(&self) -> &BTreeMap<String, WorkerDef> {
        &self.workers
    }

    pub fn agents(&self) -> &BTreeMap<String, AgentDef> {
        &self.agents
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskDef> {
        &self.tasks
    }

    pub fn worker(&self, name: &str) -> Option<&WorkerDef> {
        self.workers.get(name)
    }

    pub fn agent(&self, name: &str) -> Option<&AgentDef> {
        self.agents.get(name)
    }

    pub fn task(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty() && self.agents.is_empty() && self.tasks.is_empty()
    }

    pub fn validation_context(&self) -> ValidationContext<'_> {
        ValidationContext {
            workers: &self.workers,
        }
    }

    /// Insert every definition the document declares.
    pub(crate) fn merge(&mut self, document: Document) {
        match document {
            Document::Tasks(doc) => {
                for task in doc.tasks {
                    self.tasks.insert(task.name.clone(), task);
                }
            }
            Document::Worker(doc) => {
                self.workers.insert(doc.worker.name.clone(), doc.worker);
            }
            Document::Agent(doc) => {
                self.agents.insert(doc.agent.name.clone(), doc.agent);
            }
        }
    }
}
