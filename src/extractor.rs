use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    directive::{self, CandidateReference},
    error::{Error, Result},
};

/// Extension of every document in a tree.
pub const DOCUMENT_EXTENSION: &str = "rst";

/// A child document listed under a toctree whose file exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildReference {
    /// Root-relative directory, empty or ending in `/`.
    pub directory: String,
    pub entry_name: String,
    /// Caption in force at the reference; empty if none was set.
    pub caption: String,
}

/// One document read from disk, with its resolved children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNode {
    /// Root-relative virtual path without extension, e.g. `guides/setup`.
    pub doc_path: String,
    pub file_path: PathBuf,
    pub title: String,
    pub raw_content: String,
    pub children: Vec<ChildReference>,
}

/// Location of `entry` inside `dir` under `root`.
pub fn document_path(root: &Path, dir: &str, entry: &str) -> PathBuf {
    root.join(dir).join(format!("{entry}.{DOCUMENT_EXTENSION}"))
}

/// Read one document and resolve the children listed in its toctree.
///
/// References whose file does not exist are dropped. Documents without a
/// toctree marker have no children.
pub async fn extract_document(
    root_path: &Path,
    current_dir: &str,
    entry_file: &str,
) -> Result<DocumentNode> {
    let current_dir = directive::join_directory(current_dir, &[]);
    let file_path = document_path(root_path, &current_dir, entry_file);

    let raw_content = match tokio::fs::read_to_string(&file_path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound {
                kind: "document",
                name: file_path.display().to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    debug!(path = %file_path.display(), "read document");

    let parsed = directive::parse(&raw_content, "");
    let mut children = Vec::new();
    if parsed.has_toctree {
        for candidate in &parsed.references {
            if let Some(child) =
                resolve_child(root_path, &current_dir, candidate).await
            {
                children.push(child);
            }
        }
    }
    debug!(
        path = %file_path.display(),
        candidates = parsed.references.len(),
        children = children.len(),
        "resolved toctree"
    );

    Ok(DocumentNode {
        doc_path: format!("{current_dir}{entry_file}"),
        title: parsed.title.to_string(),
        file_path,
        children,
        raw_content,
    })
}

async fn resolve_child(
    root_path: &Path,
    current_dir: &str,
    candidate: &CandidateReference<'_>,
) -> Option<ChildReference> {
    let (segments, entry) = directive::split_reference(candidate.raw);
    let directory = directive::join_directory(current_dir, &segments);
    let full_path = document_path(root_path, &directory, entry);

    let exists = tokio::fs::metadata(&full_path)
        .await
        .is_ok_and(|m| m.is_file());
    if !exists {
        debug!(path = %full_path.display(), "dropping missing reference");
        return None;
    }

    Some(ChildReference {
        directory,
        entry_name: entry.to_string(),
        caption: candidate.caption.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = extract_document(tmp.path(), "", "index").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "document", .. }));
    }

    #[tokio::test]
    async fn keeps_only_existing_children_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "index.rst",
            "Home\n====\n\n.. toctree::\n\n   zeta\n   missing\n   guides/alpha\n",
        );
        write(tmp.path(), "zeta.rst", "Zeta\n====\n");
        write(tmp.path(), "guides/alpha.rst", "Alpha\n=====\n");

        let node = extract_document(tmp.path(), "", "index").await.unwrap();

        assert_eq!(node.doc_path, "index");
        assert_eq!(node.title, "Home");
        assert_eq!(node.file_path, tmp.path().join("index.rst"));
        let children: Vec<_> = node
            .children
            .iter()
            .map(|c| (c.directory.as_str(), c.entry_name.as_str()))
            .collect();
        assert_eq!(children, vec![("", "zeta"), ("guides/", "alpha")]);
    }

    #[tokio::test]
    async fn no_marker_means_no_children() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "index.rst", "Home\n====\n\n   child\n");
        write(tmp.path(), "child.rst", "Child\n=====\n");

        let node = extract_document(tmp.path(), "", "index").await.unwrap();
        assert!(node.children.is_empty());
        assert_eq!(node.raw_content, "Home\n====\n\n   child\n");
    }

    #[tokio::test]
    async fn references_resolve_relative_to_current_dir() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "guides/index.rst",
            "Guides\n======\n.. toctree::\n   :caption: Basics\n\n   setup\n   /advanced/tuning\n",
        );
        write(tmp.path(), "guides/setup.rst", "Setup\n=====\n");
        write(tmp.path(), "guides/advanced/tuning.rst", "Tuning\n======\n");

        let node = extract_document(tmp.path(), "guides/", "index")
            .await
            .unwrap();

        assert_eq!(node.doc_path, "guides/index");
        assert_eq!(
            node.children,
            vec![
                ChildReference {
                    directory: "guides/".into(),
                    entry_name: "setup".into(),
                    caption: "Basics".into(),
                },
                ChildReference {
                    directory: "guides/advanced/".into(),
                    entry_name: "tuning".into(),
                    caption: "Basics".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn current_dir_without_trailing_slash() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a/b.rst", "B\n=\n");

        let node = extract_document(tmp.path(), "a", "b").await.unwrap();
        assert_eq!(node.doc_path, "a/b");
    }
}
