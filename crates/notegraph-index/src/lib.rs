//! Incremental semantic index over a Markdown note tree.
//!
//! Notes are parsed into a canonical text plus heading blocks, embedded in
//! batches, and persisted as f32 vectors in SQLite. Queries run against an
//! in-memory snapshot: nearest-neighbor search, similar-note lookup, and
//! multi-level connection graphs. A debounced watcher keeps the store current
//! while the process runs.

pub mod codec;
pub mod error;
pub mod graph;
pub mod index;
pub mod parser;
pub mod pipeline;
pub mod scanner;
pub mod search;
pub mod store;
pub mod watcher;

pub use error::{IndexError, Result};
pub use graph::{ConnectionNode, build_graph};
pub use index::NoteIndex;
pub use parser::{DOCUMENT_BLOCK_KEY, ParsedBlock, ParsedNote, parse_note};
pub use pipeline::{PipelineConfig, PipelineStats, run_pipeline};
pub use scanner::{ChangeSet, scan_changes};
pub use search::{NoteMatch, cosine_similarity, find_similar, keyword_fallback, nearest};
pub use store::{BlockRecord, NoteRecord, NoteStore};
pub use watcher::{NoteUpdate, NoteWatcher, WatcherConfig};
