use std::path::Path;

use futures::future::join_all;
use tracing::debug;

use crate::{
    error::{Error, Result},
    record::IndexRecord,
    task::Task,
};

/// Write records as a pretty-printed JSON array.
///
/// The file is written next to its destination and renamed over it, so a
/// reader never observes a half-written snapshot.
pub async fn write_snapshot(path: &Path, records: &[IndexRecord]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(records)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;

    debug!(path = %path.display(), records = records.len(), "wrote snapshot");
    Ok(())
}

/// Read a snapshot file written by [`write_snapshot`].
pub async fn read_snapshot(path: &Path) -> Result<Vec<IndexRecord>> {
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

async fn read_task_snapshot(task: &Task) -> Result<Vec<IndexRecord>> {
    if !tokio::fs::try_exists(&task.target_file).await? {
        return Err(Error::MissingSnapshot {
            topic: task.topic.clone(),
            path: task.target_file.clone(),
        });
    }
    read_snapshot(&task.target_file).await
}

/// Concatenate every task's snapshot in task order and number the result.
///
/// Snapshots are read concurrently. Ids are the records' positions in the
/// merged collection, so they are always `0..len`.
pub async fn merge_snapshots(tasks: &[Task]) -> Result<Vec<IndexRecord>> {
    let loaded = join_all(tasks.iter().map(read_task_snapshot)).await;

    let mut merged = Vec::new();
    for records in loaded {
        merged.extend(records?);
    }
    for (id, record) in merged.iter_mut().enumerate() {
        record.id = Some(id as u64);
    }
    Ok(merged)
}
