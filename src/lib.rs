//! docsift - crawl reStructuredText documentation trees into a flat,
//! searchable index.
//!
//! Each configured task either walks a tree of `.rst` documents linked by
//! `toctree` directives, or flattens a directory of nested JSON sources.
//! Every task writes its own snapshot; a refresh merges all snapshots,
//! numbers the records and builds an in-memory
//! [Tantivy](https://github.com/quickwit-oss/tantivy) index over them.
//!
//! # Quick start
//!
//! ```no_run
//! use docsift::{DataDir, IndexService};
//!
//! # async fn run() -> docsift::Result<()> {
//! let data_dir = DataDir::resolve(None)?;
//! let service = IndexService::from_data_dir(&data_dir, None);
//!
//! for outcome in service.trigger_build_all_tasks(None).await? {
//!     if let Err(e) = outcome.result {
//!         eprintln!("{}: {e}", outcome.topic);
//!     }
//! }
//! service.trigger_refresh_index().await?;
//!
//! for hit in service.query("device connection", 10).await? {
//!     println!("{:>3}. [{:.3}] {} {}", hit.rank, hit.score, hit.title, hit.url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod data_dir;
pub mod directive;
pub mod error;
pub mod extractor;
pub mod flat;
pub mod record;
pub mod service;
pub mod snapshot;
pub mod tantivy_index;
pub mod task;
pub mod tree;

pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use record::IndexRecord;
pub use service::IndexService;
pub use tantivy_index::{EngineHandle, SearchEngine, SearchHit};
pub use task::{SourceKind, Task};
