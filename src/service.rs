//! The operations a transport layer drives: build per-task snapshots,
//! refresh the merged index, and query it.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    data_dir::DataDir,
    error::Result,
    flat::{SkippedSource, aggregate_flat},
    snapshot::{merge_snapshots, write_snapshot},
    tantivy_index::{EngineHandle, SearchEngine, SearchHit},
    task::{SourceKind, Task, filter_tasks, load_tasks},
    tree::index_tree,
};

/// What a successful task build produced.
#[derive(Debug, Default)]
pub struct TaskReport {
    pub records: usize,
    /// Flat source files left out of the snapshot.
    pub skipped: Vec<SkippedSource>,
}

/// Result of building one task's snapshot.
#[derive(Debug)]
pub struct TaskOutcome {
    pub topic: String,
    pub target_file: PathBuf,
    pub result: Result<TaskReport>,
}

/// Summary of a merged index refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshStatus {
    pub tasks: usize,
    pub records: usize,
    pub snapshot: PathBuf,
}

/// Crawl one task and write its snapshot to the task's target file.
///
/// Nothing is written when the crawl fails.
pub async fn build_task(task: &Task) -> Result<TaskReport> {
    let (records, skipped) = match task.kind {
        SourceKind::Tree => (index_tree(task).await?, Vec::new()),
        SourceKind::Flat => {
            let ingest = aggregate_flat(task).await?;
            (ingest.records, ingest.skipped)
        }
    };

    write_snapshot(&task.target_file, &records).await?;
    Ok(TaskReport {
        records: records.len(),
        skipped,
    })
}

/// Build every task concurrently.
///
/// One task failing does not stop the others; each outcome carries its own
/// result, in task order.
pub async fn build_tasks(tasks: &[Task]) -> Vec<TaskOutcome> {
    let results = join_all(tasks.iter().map(build_task)).await;

    tasks
        .iter()
        .zip(results)
        .map(|(task, result)| {
            let result = result.map_err(|e| {
                warn!(topic = %task.topic, error = %e, "task failed");
                e.in_task(&task.topic)
            });
            TaskOutcome {
                topic: task.topic.clone(),
                target_file: task.target_file.clone(),
                result,
            }
        })
        .collect()
}

/// Owns the task configuration and the active search engine.
#[derive(Debug)]
pub struct IndexService {
    tasks_file: PathBuf,
    merged_snapshot: PathBuf,
    engine: EngineHandle,
    refresh: Mutex<()>,
}

impl IndexService {
    pub fn new(tasks_file: PathBuf, merged_snapshot: PathBuf) -> Self {
        Self {
            tasks_file,
            merged_snapshot,
            engine: EngineHandle::new(),
            refresh: Mutex::new(()),
        }
    }

    /// Use the data directory's task file unless `tasks_file` overrides it.
    pub fn from_data_dir(data_dir: &DataDir, tasks_file: Option<&Path>) -> Self {
        Self::new(
            tasks_file.map_or_else(|| data_dir.tasks_file(), Path::to_path_buf),
            data_dir.merged_snapshot(),
        )
    }

    pub fn tasks_file(&self) -> &Path {
        &self.tasks_file
    }

    pub fn merged_snapshot(&self) -> &Path {
        &self.merged_snapshot
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub async fn load_tasks(&self) -> Result<Vec<Task>> {
        load_tasks(&self.tasks_file).await
    }

    /// Build snapshots for the configured tasks, optionally only those
    /// whose topic is in `topics`.
    pub async fn trigger_build_all_tasks(
        &self,
        topics: Option<&[String]>,
    ) -> Result<Vec<TaskOutcome>> {
        let tasks = filter_tasks(self.load_tasks().await?, topics);
        info!(tasks = tasks.len(), "building task snapshots");
        Ok(build_tasks(&tasks).await)
    }

    /// Merge every task snapshot, build a new engine over it, persist the
    /// merged snapshot and swap the engine in.
    ///
    /// On failure the previously active engine keeps serving queries, and
    /// the merged snapshot on disk still matches it.
    pub async fn trigger_refresh_index(&self) -> Result<RefreshStatus> {
        let _guard = self.refresh.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<RefreshStatus> {
        let tasks = self.load_tasks().await?;
        let records = Arc::new(merge_snapshots(&tasks).await?);

        let engine = {
            let records = Arc::clone(&records);
            tokio::task::spawn_blocking(move || SearchEngine::build(records))
                .await??
        };
        write_snapshot(&self.merged_snapshot, &records).await?;
        self.engine.replace(engine);
        info!(
            tasks = tasks.len(),
            records = records.len(),
            path = %self.merged_snapshot.display(),
            "search index refreshed"
        );

        Ok(RefreshStatus {
            tasks: tasks.len(),
            records: records.len(),
            snapshot: self.merged_snapshot.clone(),
        })
    }

    /// The active engine, refreshing first if none was built yet.
    pub async fn ensure_engine(&self) -> Result<Arc<SearchEngine>> {
        if let Ok(engine) = self.engine.current() {
            return Ok(engine);
        }
        let _guard = self.refresh.lock().await;
        if !self.engine.is_ready() {
            self.refresh_locked().await?;
        }
        self.engine.current()
    }

    /// Search the active engine, refreshing first if none was built yet.
    pub async fn query(
        &self,
        terms: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let hits = self.ensure_engine().await?.search(terms, limit)?;
        info!(terms, hits = hits.len(), "query");
        Ok(hits)
    }
}
