use std::{
    fmt,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable that relocates the working directory.
pub const DATA_DIR_ENV: &str = "DOCSIFT_DATA_DIR";

/// Where the working directory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Flag,
    Env,
    Xdg,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Origin::Flag => "--data-dir",
            Origin::Env => DATA_DIR_ENV,
            Origin::Xdg => "XDG data home",
        })
    }
}

/// Working directory holding the task list and the merged snapshot.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
    origin: Origin,
}

impl DataDir {
    /// Pick the working directory and make sure it exists.
    ///
    /// `--data-dir` wins over `DOCSIFT_DATA_DIR`, which wins over
    /// `$XDG_DATA_HOME/docsift`.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let env = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty());
        let (root, origin) = match (explicit, env) {
            (Some(path), _) => (path.to_path_buf(), Origin::Flag),
            (None, Some(val)) => (PathBuf::from(val), Origin::Env),
            (None, None) => (xdg_home()?, Origin::Xdg),
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;
        debug!(root = %root.display(), %origin, "using data directory");

        Ok(Self { root, origin })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Default location of the task list.
    pub fn tasks_file(&self) -> PathBuf {
        self.root.join("tasks.json")
    }

    /// The merged snapshot, rewritten on every refresh.
    pub fn merged_snapshot(&self) -> PathBuf {
        self.root.join("search-index.json")
    }
}

fn xdg_home() -> Result<PathBuf> {
    xdg::BaseDirectories::with_prefix("docsift")
        .get_data_home()
        .ok_or_else(|| Error::Config("no XDG data home for docsift".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_names_both_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::resolve(Some(tmp.path())).unwrap();

        assert_eq!(dir.root(), tmp.path());
        assert_eq!(dir.origin(), Origin::Flag);
        assert_eq!(dir.tasks_file(), tmp.path().join("tasks.json"));
        assert_eq!(
            dir.merged_snapshot(),
            tmp.path().join("search-index.json")
        );
    }

    #[test]
    fn missing_directory_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let dir = DataDir::resolve(Some(&nested)).unwrap();

        assert!(dir.root().is_dir());
    }

    #[test]
    fn unusable_path_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, "").unwrap();

        let err = DataDir::resolve(Some(&file.join("sub"))).unwrap_err();
        assert!(matches!(err, Error::DataDir(_)));
    }
}
