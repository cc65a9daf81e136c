use std::{
    collections::HashMap,
    ops::Range,
    sync::{Arc, PoisonError, RwLock},
};

use serde::Serialize;
use tantivy::{
    Index,
    IndexReader,
    IndexWriter,
    TantivyDocument,
    collector::TopDocs,
    doc,
    query::QueryParser,
    schema::*,
    snippet::SnippetGenerator,
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        Stemmer,
        TextAnalyzer,
    },
};

use crate::{
    error::{Error, Result},
    record::IndexRecord,
};

/// Field names used in the schema.
pub mod fields {
    pub const ID: &str = "id";
    pub const TOPIC: &str = "topic";
    pub const CAPTION: &str = "caption";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
}

const WRITER_MEMORY_BUDGET: usize = 15_000_000;
const SNIPPET_MAX_CHARS: usize = 200;

/// Resolved field handles for the schema.
#[derive(Clone, Copy)]
struct SchemaFields {
    id: Field,
    topic: Field,
    caption: Field,
    title: Field,
    description: Field,
}

/// A ranked match, rehydrated with the record it refers to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub score: f32,
    pub id: u64,
    pub topic: String,
    pub caption: String,
    pub title: String,
    pub description: String,
    pub url: String,
    /// Description fragment around the best match.
    pub snippet: String,
    /// Byte ranges of matched terms inside `snippet`.
    pub highlights: Vec<Range<usize>>,
}

fn build_schema() -> (Schema, SchemaFields) {
    let mut builder = Schema::builder();

    let id = builder.add_u64_field(fields::ID, STORED | FAST);

    let text_opts = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("en_stem")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );
    let topic = builder.add_text_field(fields::TOPIC, text_opts.clone());
    let caption = builder.add_text_field(fields::CAPTION, text_opts.clone());
    let title = builder.add_text_field(fields::TITLE, text_opts.clone());
    let description = builder.add_text_field(fields::DESCRIPTION, text_opts);

    let schema = builder.build();
    let fields = SchemaFields {
        id,
        topic,
        caption,
        title,
        description,
    };

    (schema, fields)
}

fn register_tokenizers(index: &Index) {
    let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(Stemmer::new(tantivy::tokenizer::Language::English))
        .build();
    index.tokenizers().register("en_stem", en_stem);
}

/// An immutable full-text index over one merged collection.
///
/// Only ids are stored in the index; hits are filled in from the
/// collection the engine was built from.
pub struct SearchEngine {
    index: Index,
    reader: IndexReader,
    fields: SchemaFields,
    records: Arc<Vec<IndexRecord>>,
    positions: HashMap<u64, usize>,
}

impl SearchEngine {
    /// Index every record of a merged collection in memory.
    ///
    /// Records without an id are keyed by their position.
    pub fn build(records: Arc<Vec<IndexRecord>>) -> Result<Self> {
        let (schema, fields) = build_schema();
        let index = Index::create_in_ram(schema);
        register_tokenizers(&index);

        let mut positions = HashMap::with_capacity(records.len());
        let mut writer: IndexWriter = index.writer(WRITER_MEMORY_BUDGET)?;
        for (pos, record) in records.iter().enumerate() {
            let id = record.id.unwrap_or(pos as u64);
            positions.insert(id, pos);
            writer.add_document(doc!(
                fields.id => id,
                fields.topic => record.topic.as_str(),
                fields.caption => record.caption.as_str(),
                fields.title => record.title.as_str(),
                fields.description => record.description.as_str(),
            ))?;
        }
        writer.commit()?;

        let reader = index.reader()?;
        reader.reload()?;

        Ok(Self {
            index,
            reader,
            fields,
            records,
            positions,
        })
    }

    /// The collection this engine was built from.
    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    /// Rank records against free-text terms.
    ///
    /// Returns at most `limit` hits, best first. Blank or unmatched terms
    /// give an empty list. The title field is boosted 2x.
    pub fn search(&self, terms: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if terms.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let f = self.fields;
        let searcher = self.reader.searcher();

        let mut parser = QueryParser::for_index(
            &self.index,
            vec![f.topic, f.caption, f.title, f.description],
        );
        parser.set_field_boost(f.title, 2.0);

        let (query, _errors) = parser.parse_query_lenient(terms);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;
        if top_docs.is_empty() {
            return Ok(Vec::new());
        }

        let mut snippets =
            SnippetGenerator::create(&searcher, &*query, f.description)?;
        snippets.set_max_num_chars(SNIPPET_MAX_CHARS);

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            let id = doc
                .get_first(f.id)
                .and_then(|v| v.as_u64())
                .unwrap_or_default();
            let Some(record) =
                self.positions.get(&id).and_then(|&pos| self.records.get(pos))
            else {
                continue;
            };

            let snippet = snippets.snippet(&record.description);
            hits.push(SearchHit {
                rank: hits.len() + 1,
                score,
                id,
                topic: record.topic.clone(),
                caption: record.caption.clone(),
                title: record.title.clone(),
                description: record.description.clone(),
                url: record.url.clone(),
                snippet: snippet.fragment().to_string(),
                highlights: snippet.highlighted().to_vec(),
            });
        }

        Ok(hits)
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

/// Shared slot holding the engine queries run against.
///
/// Replacing the engine swaps an `Arc`; searches that already took the old
/// one finish against it.
#[derive(Debug, Default)]
pub struct EngineHandle {
    active: RwLock<Option<Arc<SearchEngine>>>,
}

impl EngineHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The engine currently serving queries.
    pub fn current(&self) -> Result<Arc<SearchEngine>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::EngineNotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Make `engine` the active engine, returning the previous one.
    pub fn replace(&self, engine: SearchEngine) -> Option<Arc<SearchEngine>> {
        self.active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(engine))
    }

    pub fn search(&self, terms: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.current()?.search(terms, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        id: u64,
        topic: &str,
        caption: &str,
        title: &str,
        desc: &str,
    ) -> IndexRecord {
        IndexRecord {
            topic: topic.into(),
            caption: caption.into(),
            title: title.into(),
            description: desc.into(),
            url: format!("https://docs.example.com/{id}.html"),
            file_path: String::new(),
            id: Some(id),
            extra: Default::default(),
        }
    }

    fn sample() -> Arc<Vec<IndexRecord>> {
        Arc::new(vec![
            record(
                0,
                "guide",
                "",
                "Installation",
                "Install the package with pip and configure the runners.",
            ),
            record(
                1,
                "guide",
                "Tutorials",
                "Writing Tests",
                "Tests are collected from modules and executed in order.",
            ),
            record(
                2,
                "api.json",
                "Functions",
                "connect",
                "Open a connection to a device using the testbed file.",
            ),
            record(
                3,
                "guide",
                "Tutorials",
                "Device Connection",
                "Connecting to a device requires credentials.",
            ),
        ])
    }

    #[test]
    fn empty_and_unmatched_queries_return_nothing() {
        let engine = SearchEngine::build(sample()).unwrap();
        assert!(engine.search("", 10).unwrap().is_empty());
        assert!(engine.search("   ", 10).unwrap().is_empty());
        assert!(engine.search("zzzznomatch", 10).unwrap().is_empty());
        assert!(engine.search("install", 0).unwrap().is_empty());
    }

    #[test]
    fn hits_are_rehydrated_from_records() {
        let engine = SearchEngine::build(sample()).unwrap();
        let hits = engine.search("pip", 10).unwrap();

        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.id, 0);
        assert_eq!(hit.rank, 1);
        assert_eq!(hit.title, "Installation");
        assert_eq!(hit.topic, "guide");
        assert_eq!(hit.url, "https://docs.example.com/0.html");
        assert!(hit.description.contains("pip"));
        assert!(hit.score > 0.0);
    }

    #[test]
    fn searches_all_four_fields() {
        let engine = SearchEngine::build(sample()).unwrap();

        let by_topic = engine.search("api", 10).unwrap();
        assert_eq!(by_topic.len(), 1);
        assert_eq!(by_topic[0].id, 2);

        let by_caption = engine.search("tutorials", 10).unwrap();
        let mut ids: Vec<_> = by_caption.iter().map(|h| h.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);

        let by_title = engine.search("installation", 10).unwrap();
        assert_eq!(by_title[0].id, 0);
    }

    #[test]
    fn stemming_matches_word_forms() {
        let engine = SearchEngine::build(sample()).unwrap();
        let hits = engine.search("connecting", 10).unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
        assert!(ids.contains(&2));
        assert!(ids.contains(&3));
    }

    #[test]
    fn title_matches_rank_first() {
        let engine = SearchEngine::build(sample()).unwrap();
        // Both mention a device; only one has it in the title.
        let hits = engine.search("device", 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 3);
        for window in hits.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
    }

    #[test]
    fn snippet_highlights_matched_terms() {
        let engine = SearchEngine::build(sample()).unwrap();
        let hits = engine.search("credentials", 10).unwrap();

        let hit = &hits[0];
        assert!(!hit.highlights.is_empty());
        let range = hit.highlights[0].clone();
        assert_eq!(&hit.snippet[range], "credentials");
    }

    #[test]
    fn limit_caps_results() {
        let engine = SearchEngine::build(sample()).unwrap();
        assert_eq!(engine.search("device", 1).unwrap().len(), 1);
    }

    #[test]
    fn records_without_ids_are_keyed_by_position() {
        let mut records = (*sample()).clone();
        for r in &mut records {
            r.id = None;
        }
        let engine = SearchEngine::build(Arc::new(records)).unwrap();
        let hits = engine.search("pip", 10).unwrap();
        assert_eq!(hits[0].id, 0);
        assert_eq!(hits[0].title, "Installation");
    }

    #[test]
    fn handle_before_build_is_not_ready() {
        let handle = EngineHandle::new();
        assert!(!handle.is_ready());
        assert!(matches!(handle.search("pip", 10), Err(Error::EngineNotReady)));
    }

    #[test]
    fn replace_keeps_old_engine_alive_for_holders() {
        let handle = EngineHandle::new();
        handle.replace(SearchEngine::build(sample()).unwrap());
        let old = handle.current().unwrap();

        let fresh = Arc::new(vec![record(0, "other", "", "Fresh", "brand new")]);
        let previous = handle.replace(SearchEngine::build(fresh).unwrap());

        assert!(previous.is_some());
        assert_eq!(old.search("pip", 10).unwrap().len(), 1);
        assert!(handle.search("pip", 10).unwrap().is_empty());
        assert_eq!(handle.search("fresh", 10).unwrap()[0].title, "Fresh");
    }
}
