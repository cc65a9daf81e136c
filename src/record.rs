use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys owned by [`IndexRecord`]; anything else lands in `extra`.
const RESERVED_KEYS: &[&str] = &[
    "topic",
    "caption",
    "title",
    "desc",
    "description",
    "url",
    "filePath",
    "id",
];

/// One searchable entry, as stored in per-task and merged snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecord {
    pub topic: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "desc", alias = "description", default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub file_path: String,
    /// Position in the merged collection. Absent in per-task snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Source fields carried through from flat JSON sources.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IndexRecord {
    /// Drop keys from `fields` that would collide with the record's own.
    pub fn passthrough(mut fields: Map<String, Value>) -> Map<String, Value> {
        fields.retain(|k, _| !RESERVED_KEYS.contains(&k.as_str()));
        fields
    }
}

/// Build a page URL, collapsing repeated slashes and dropping backslashes.
///
/// The `//` following a URL scheme is kept.
///
/// ```
/// use docsift::record::page_url;
///
/// assert_eq!(
///     page_url("https://docs.example.com/", "guides/setup"),
///     "https://docs.example.com/guides/setup.html"
/// );
/// ```
pub fn page_url(root_url: &str, doc_path: &str) -> String {
    let raw = format!("{}{doc_path}.html", root_url.trim());
    let (scheme, rest) = match raw.find("://") {
        Some(pos) => raw.split_at(pos + 3),
        None => ("", raw.as_str()),
    };

    let mut url = String::with_capacity(raw.len());
    url.push_str(scheme);
    let mut prev_slash = false;
    for c in rest.chars().filter(|&c| c != '\\') {
        if c == '/' && prev_slash {
            continue;
        }
        prev_slash = c == '/';
        url.push(c);
    }
    url
}
