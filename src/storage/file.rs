//! Local JSON file parameter store.
//!
//! The whole document is loaded on open and rewritten after every mutation:
//!
//! ```json
//! { "parameters": [ { "name": "/dev/common/db", "type": "String", "value": "db.internal" } ] }
//! ```

use crate::Result;
use crate::context::CallContext;
use crate::models::Parameter;
use crate::storage::backend::{Page, PageRequest, ParameterStore};
use crate::storage::memory::MemoryStore;
use crate::storage::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    parameters: Vec<Parameter>,
}

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store; it is
    /// created on the first write.
    pub fn open(path: &Path) -> Result<Self> {
        let mut inner = MemoryStore::new();
        if path.exists() {
            let content = fs::read_to_string(path)?;
            if !content.trim().is_empty() {
                let doc: StoreDocument = serde_json::from_str(&content)?;
                for parameter in doc.parameters {
                    inner.insert(parameter);
                }
            }
        }
        tracing::debug!(path = %path.display(), parameters = inner.len(), "Opened file store");
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    fn persist(&self) -> StoreResult<()> {
        let doc = StoreDocument {
            parameters: self.inner.parameters().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
            }
        }
        // Write beside the target and rename so readers never see half a file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.write_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.write_error(e))?;
        Ok(())
    }

    /// Persist the change just made to `name`, restoring `previous` in
    /// memory if the document cannot be written.
    fn commit(&mut self, name: &str, previous: Option<Parameter>) -> StoreResult<()> {
        if let Err(e) = self.persist() {
            match previous {
                Some(parameter) => self.inner.insert(parameter),
                None => {
                    self.inner.remove(name);
                }
            }
            tracing::warn!(name, error = %e, "Rolled back unsaved change");
            return Err(e);
        }
        Ok(())
    }

    fn write_error(&self, e: std::io::Error) -> StoreError {
        StoreError::Transport(format!("failed to write {}: {}", self.path.display(), e))
    }
}

impl ParameterStore for FileStore {
    fn get(&self, ctx: &CallContext, name: &str) -> StoreResult<Parameter> {
        self.inner.get(ctx, name)
    }

    fn put(
        &mut self,
        ctx: &CallContext,
        parameter: &Parameter,
        overwrite: bool,
    ) -> StoreResult<()> {
        let previous = self.inner.peek(&parameter.name).cloned();
        self.inner.put(ctx, parameter, overwrite)?;
        self.commit(&parameter.name, previous)
    }

    fn delete(&mut self, ctx: &CallContext, name: &str) -> StoreResult<()> {
        let previous = self.inner.peek(name).cloned();
        self.inner.delete(ctx, name)?;
        self.commit(name, previous)
    }

    fn list_page(&self, ctx: &CallContext, request: &PageRequest<'_>) -> StoreResult<Page> {
        self.inner.list_page(ctx, request)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn backend_type(&self) -> &'static str {
        "file"
    }
}
