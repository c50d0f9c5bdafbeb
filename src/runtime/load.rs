//! Transactional load pipeline.
//!
//! `parse -> validate against a snapshot -> merge into a copy -> swap`.
//! Nothing touches the live registries until every step has passed, so a
//! failed load leaves them exactly as they were.

use super::{Registries, Runtime};
use crate::ast::Document;
use crate::error::{PsykerError, Result};
use crate::parser::{self, Dialect};
use crate::validate::validate_document;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

impl Runtime {
    /// Parse, validate and commit one definition file.
    pub fn load_file(&mut self, path: &Path) -> Result<Document> {
        let result = self.try_load_file(path);
        if let Err(err) = &result {
            warn!(
                path = %path.display(),
                kind = err.kind_name(),
                error = %err,
                "rejected definition file"
            );
        }
        result
    }

    fn try_load_file(&mut self, path: &Path) -> Result<Document> {
        let document = parser::parse_path(path)?;

        let mut next = Registries::clone(&self.registries);
        validate_document(&document, &next.validation_context())?;
        next.merge(document.clone());
        self.registries = Arc::new(next);

        info!(
            path = %path.display(),
            names = ?document.declared_names(),
            "loaded definitions"
        );
        Ok(document)
    }

    /// Load every definition file directly inside `dir`: workers first, then
    /// agents, then tasks, each group by lowercase file name. Each file is its
    /// own transaction; the first failure stops the walk and files loaded
    /// before it stay loaded.
    ///
    /// Returns the files loaded, in order.
    pub fn load_dir(&mut self, dir: &Path) -> Result<Vec<PathBuf>> {
        let files = definition_files(dir)?;
        for path in &files {
            self.load_file(path)?;
        }
        Ok(files)
    }
}

/// Definition files in `dir`, in load order.
pub fn definition_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PsykerError::general(format!(
            "Definitions directory '{}' does not exist",
            dir.display()
        ))
        .with_hint("Pass an existing directory containing .psy, .psyw, or .psya files."));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| {
        PsykerError::general(format!(
            "failed to read directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let mut files: Vec<(u8, String, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            PsykerError::general(format!(
                "failed to read directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(dialect) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Dialect::from_extension)
        else {
            continue;
        };
        let name = entry.file_name().to_string_lossy().to_lowercase();
        files.push((dialect.load_order(), name, path));
    }

    files.sort();
    Ok(files.into_iter().map(|(_, _, path)| path).collect())
}
