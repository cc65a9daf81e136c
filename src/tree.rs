use futures::{
    FutureExt,
    StreamExt,
    TryStreamExt,
    future::BoxFuture,
    stream,
};
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    extractor::extract_document,
    record::{IndexRecord, page_url},
    task::Task,
};

/// Crawl a task's document tree into records.
///
/// Records come out depth-first, pre-order: each document is followed by
/// the full subtree of each of its children, in toctree order. A reference
/// back to a document on the current path is dropped. Any unreadable
/// document fails the whole task.
pub async fn index_tree(task: &Task) -> Result<Vec<IndexRecord>> {
    let entry = task.entry_file.clone().ok_or_else(|| {
        Error::Config(format!("task '{}' has no entryFile", task.topic))
    })?;
    let caption = task.caption.clone().unwrap_or_default();

    let records =
        index_subtree(task, String::new(), entry, caption, Vec::new()).await?;
    info!(topic = %task.topic, records = records.len(), "indexed document tree");
    Ok(records)
}

fn index_subtree(
    task: &Task,
    dir: String,
    entry: String,
    caption: String,
    mut ancestors: Vec<String>,
) -> BoxFuture<'_, Result<Vec<IndexRecord>>> {
    async move {
        let node = extract_document(&task.root_path, &dir, &entry).await?;
        ancestors.push(node.doc_path.clone());

        let record = IndexRecord {
            topic: task.topic.clone(),
            caption: caption.clone(),
            title: node.title,
            url: page_url(&task.root_url, &node.doc_path),
            description: node.raw_content,
            file_path: node.file_path.display().to_string(),
            id: None,
            extra: Default::default(),
        };

        let children: Vec<_> = node
            .children
            .into_iter()
            .filter(|child| {
                let doc_path = format!("{}{}", child.directory, child.entry_name);
                let cyclic = ancestors.contains(&doc_path);
                if cyclic {
                    debug!(%doc_path, "dropping reference to an ancestor");
                }
                !cyclic
            })
            .collect();

        // Siblings run one at a time so output order follows the toctree.
        stream::iter(children)
            .map(Ok::<_, Error>)
            .try_fold(vec![record], |mut records, child| {
                let caption = if child.caption.is_empty() {
                    caption.clone()
                } else {
                    child.caption
                };
                let ancestors = ancestors.clone();
                async move {
                    let subtree = index_subtree(
                        task,
                        child.directory,
                        child.entry_name,
                        caption,
                        ancestors,
                    )
                    .await?;
                    records.extend(subtree);
                    Ok::<_, Error>(records)
                }
            })
            .await
    }
    .boxed()
}
