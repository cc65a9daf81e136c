use std::path::{Path, PathBuf};

use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    record::IndexRecord,
    task::Task,
};

/// Leaf keys tried, in order, for a record's description.
const DESCRIPTION_KEYS: &[&str] = &["doc", "description", "desc"];

/// A source file that was left out of a flat task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

/// Records gathered from a flat task's source directory.
#[derive(Debug, Default)]
pub struct FlatIngest {
    pub records: Vec<IndexRecord>,
    pub skipped: Vec<SkippedSource>,
}

/// Flatten every JSON file directly inside the task's root directory.
///
/// Each file is a `caption -> title -> fields` mapping; every leaf becomes
/// one record whose topic is the file name. Files are processed in name
/// order. A file that cannot be read or parsed is skipped and reported
/// rather than failing the task.
pub async fn aggregate_flat(task: &Task) -> Result<FlatIngest> {
    let files = list_source_files(&task.root_path).await?;
    info!(
        topic = %task.topic,
        files = files.len(),
        "found flat source files"
    );

    let parsed = join_all(files.iter().map(|path| read_source(path))).await;

    let mut ingest = FlatIngest::default();
    for (path, result) in files.into_iter().zip(parsed) {
        match result {
            Ok(records) => ingest.records.extend(records),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping source file");
                ingest.skipped.push(SkippedSource {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(ingest)
}

async fn list_source_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound {
                kind: "source directory",
                name: root.display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

async fn read_source(path: &Path) -> Result<Vec<IndexRecord>> {
    let content = tokio::fs::read_to_string(path).await?;
    let source: Map<String, Value> =
        serde_json::from_str(&content).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    flatten(path, source)
}

/// Turn a `caption -> title -> fields` object into records, in file order.
///
/// The topic is the file name. A caption or title whose value is not an
/// object rejects the whole file.
fn flatten(path: &Path, source: Map<String, Value>) -> Result<Vec<IndexRecord>> {
    let topic = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let shape = |detail: String| Error::Shape {
        path: path.to_path_buf(),
        detail,
    };

    let mut records = Vec::new();
    for (caption, entries) in source {
        let Value::Object(entries) = entries else {
            return Err(shape(format!("caption '{caption}' is not an object")));
        };
        for (title, fields) in entries {
            let Value::Object(fields) = fields else {
                return Err(shape(format!(
                    "entry '{caption}' / '{title}' is not an object"
                )));
            };
            records.push(IndexRecord {
                topic: topic.clone(),
                caption: caption.clone(),
                description: description_of(&fields),
                title,
                url: string_field(&fields, "url"),
                file_path: String::new(),
                id: None,
                extra: IndexRecord::passthrough(fields),
            });
        }
    }
    Ok(records)
}

fn description_of(fields: &Map<String, Value>) -> String {
    DESCRIPTION_KEYS
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
