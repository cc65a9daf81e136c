use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("search index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("background task failed: {0}")]
    Background(#[from] tokio::task::JoinError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected layout in {}: {detail}", path.display())]
    Shape { path: PathBuf, detail: String },

    #[error("snapshot for task '{topic}' does not exist: {}", path.display())]
    MissingSnapshot { topic: String, path: PathBuf },

    #[error("search engine has not been built yet")]
    EngineNotReady,

    #[error("task '{topic}' failed: {source}")]
    Task {
        topic: String,
        #[source]
        source: Box<Error>,
    },

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}

impl Error {
    /// Attach the topic of the task that produced this error.
    pub fn in_task(self, topic: &str) -> Self {
        Self::Task {
            topic: topic.to_string(),
            source: Box::new(self),
        }
    }
}
