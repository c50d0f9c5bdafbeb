//! Definition model produced by the parser.
//!
//! Every value here is immutable once built. Documents exist only between a
//! parse and the registry commit that consumes them; the definitions they
//! carry are what the runtime keeps.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A file operation or command a task statement performs, and the capability
/// a worker must hold to run it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Capability {
    #[serde(rename = "fs.open")]
    FsOpen,
    #[serde(rename = "fs.create")]
    FsCreate,
    #[serde(rename = "exec.ps")]
    ExecPs,
    #[serde(rename = "exec.cmd")]
    ExecCmd,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::FsOpen,
        Capability::FsCreate,
        Capability::ExecPs,
        Capability::ExecCmd,
    ];

    /// Look up a capability by its dotted name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fs.open" => Some(Self::FsOpen),
            "fs.create" => Some(Self::FsCreate),
            "exec.ps" => Some(Self::ExecPs),
            "exec.cmd" => Some(Self::ExecCmd),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FsOpen => "fs.open",
            Self::FsCreate => "fs.create",
            Self::ExecPs => "exec.ps",
            Self::ExecCmd => "exec.cmd",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may run a task. An empty list leaves that axis unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AccessBlock {
    pub agents: Vec<String>,
    pub workers: Vec<String>,
}

impl AccessBlock {
    pub fn permits_agent(&self, agent: &str) -> bool {
        self.agents.is_empty() || self.agents.iter().any(|a| a == agent)
    }

    pub fn permits_worker(&self, worker: &str) -> bool {
        self.workers.is_empty() || self.workers.iter().any(|w| w == worker)
    }
}

/// One statement inside a task body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStmt {
    pub op: Capability,
    pub arg: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDef {
    pub name: String,
    /// `None` means the task was declared without `@access` and is denied.
    pub access: Option<AccessBlock>,
    pub statements: Vec<TaskStmt>,
    pub source_path: Option<PathBuf>,
}

/// A capability granted to a worker. `arg` is parsed but not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerAllow {
    pub capability: Capability,
    pub arg: Option<String>,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerDef {
    pub name: String,
    pub sandbox: Option<String>,
    pub cwd: Option<String>,
    pub allows: Vec<WorkerAllow>,
    pub source_path: Option<PathBuf>,
}

impl WorkerDef {
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.allows.iter().any(|allow| allow.capability == capability)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentUse {
    pub worker_name: String,
    pub count: u32,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentDef {
    pub name: String,
    pub uses: Vec<AgentUse>,
    pub source_path: Option<PathBuf>,
}

impl AgentDef {
    /// Worker at `slot` of the round-robin pool, where each `use` contributes
    /// `count` consecutive slots in declaration order. The pool itself is
    /// never materialized.
    pub fn worker_at(&self, slot: u64) -> Option<&str> {
        let mut remaining = slot;
        for usage in &self.uses {
            let count = u64::from(usage.count);
            if remaining < count {
                return Some(usage.worker_name.as_str());
            }
            remaining -= count;
        }
        None
    }

    /// Total number of worker instances the agent spreads work across.
    pub fn worker_instances(&self) -> u64 {
        self.uses.iter().map(|u| u64::from(u.count)).sum()
    }
}

/// Contents of a `.psy` file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDocument {
    pub tasks: Vec<TaskDef>,
}

/// Contents of a `.psyw` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerDocument {
    pub worker: WorkerDef,
}

/// Contents of a `.psya` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDocument {
    pub agent: AgentDef,
}

/// A parsed file of any dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    Tasks(TaskDocument),
    Worker(WorkerDocument),
    Agent(AgentDocument),
}

impl Document {
    /// Names declared by the document, in source order.
    pub fn declared_names(&self) -> Vec<&str> {
        match self {
            Document::Tasks(doc) => doc.tasks.iter().map(|t| t.name.as_str()).collect(),
            Document::Worker(doc) => vec![doc.worker.name.as_str()],
            Document::Agent(doc) => vec![doc.agent.name.as_str()],
        }
    }
}
