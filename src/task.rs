use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a task's sources are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// reStructuredText documents linked through `toctree` directives.
    #[serde(rename = "rst", alias = "tree")]
    Tree,
    /// A directory of nested caption -> title -> fields JSON files.
    #[serde(rename = "json", alias = "flat")]
    Flat,
}

/// One configured ingestion source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub root_path: PathBuf,
    #[serde(default)]
    pub root_url: String,
    pub target_file: PathBuf,
    /// Root document name without the `.rst` extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_file: Option<String>,
    /// Caption given to the root record and inherited by its subtree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Task {
    fn resolve_paths(&mut self, base: &Path) {
        if self.root_path.is_relative() {
            self.root_path = base.join(&self.root_path);
        }
        if self.target_file.is_relative() {
            self.target_file = base.join(&self.target_file);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(Error::Config("task with an empty topic".into()));
        }
        if self.kind == SourceKind::Tree
            && self.entry_file.as_deref().is_none_or(str::is_empty)
        {
            return Err(Error::Config(format!(
                "task '{}' is a document tree but has no entryFile",
                self.topic
            )));
        }
        Ok(())
    }
}

/// Load the task list from a JSON file.
///
/// Relative `rootPath` and `targetFile` values are resolved against the
/// directory that contains the task file.
pub async fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound {
                kind: "task file",
                name: path.display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    let mut tasks: Vec<Task> =
        serde_json::from_str(&content).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut seen = std::collections::HashSet::new();
    for task in &mut tasks {
        task.validate()?;
        if !seen.insert(task.topic.clone()) {
            return Err(Error::Config(format!(
                "duplicate task topic '{}'",
                task.topic
            )));
        }
        task.resolve_paths(base);
    }

    Ok(tasks)
}

/// Keep only the tasks whose topic is listed in `topics`.
///
/// `None` keeps every task.
pub fn filter_tasks(tasks: Vec<Task>, topics: Option<&[String]>) -> Vec<Task> {
    match topics {
        Some(wanted) => tasks
            .into_iter()
            .filter(|t| wanted.iter().any(|w| w.trim() == t.topic))
            .collect(),
        None => tasks,
    }
}
