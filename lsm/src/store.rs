//! Template Store
//!
//! Layouts are loaded from a single directory level. Each regular file
//! becomes one layout named after the file with its last extension removed.
//! Entries are read in file name order, so when two files share a base name
//! the later name wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use eyre::{Context, Result};
use tracing::{debug, info};

use crate::environment::{CompiledTemplate, RenderEnvironment};

/// Layout name for a template file name
///
/// Strips everything from the last `.`; a name without a `.` is used as is.
pub fn layout_key(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    }
}

/// Compiled layouts keyed by layout name
#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: BTreeMap<String, CompiledTemplate>,
}

impl TemplateStore {
    /// Load and compile every regular file directly inside `dir`
    ///
    /// An unreadable directory or file, or a template that fails to compile,
    /// is an error for the whole build.
    pub fn load<E: RenderEnvironment>(dir: impl AsRef<Path>, env: &mut E) -> Result<Self> {
        let dir = dir.as_ref();
        debug!(?dir, "TemplateStore::load: called");

        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).context(format!("Failed to read layout directory {}", dir.display()))? {
            let entry = entry.context(format!("Failed to read layout directory {}", dir.display()))?;
            let file_type = entry
                .file_type()
                .context(format!("Failed to stat {}", entry.path().display()))?;
            if !file_type.is_file() {
                debug!(path = ?entry.path(), "TemplateStore::load: skipping non-file entry");
                continue;
            }
            entries.push(entry);
        }
        entries.sort_by_key(|entry| entry.file_name());

        let mut store = Self::default();
        for entry in entries {
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let source =
                fs::read_to_string(&path).context(format!("Failed to read layout {}", path.display()))?;
            let key = layout_key(&file_name).to_string();
            let template = env
                .compile(&key, &source)
                .context(format!("Failed to load layout {}", path.display()))?;

            if store.templates.insert(key.clone(), template).is_some() {
                debug!(%key, %file_name, "TemplateStore::load: replaced layout with same base name");
            } else {
                debug!(%key, %file_name, "TemplateStore::load: loaded layout");
            }
        }

        info!("Loaded {} layouts from {}", store.len(), dir.display());
        Ok(store)
    }

    pub fn get(&self, layout: &str) -> Option<&CompiledTemplate> {
        self.templates.get(layout)
    }

    pub fn contains(&self, layout: &str) -> bool {
        self.templates.contains_key(layout)
    }

    /// Layout names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
