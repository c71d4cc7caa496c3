//! In-memory projection of the persisted store that queries run against.

use std::collections::HashMap;

use crate::error::Result;
use crate::store::NoteStore;

/// Indexed entry for one note.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub vector: Vec<f32>,
    /// Block keys ordered by line position.
    pub block_keys: Vec<String>,
}

/// Indexed entry for one block.
#[derive(Debug, Clone)]
pub struct BlockEntry {
    pub vector: Vec<f32>,
    pub source_path: String,
}

/// Read-only nearest-neighbor index over all persisted vectors.
///
/// Built in full from the [`NoteStore`] and never partially mutated; load a
/// fresh instance to observe later store writes. The store stays the single
/// source of truth.
#[derive(Debug, Default)]
pub struct NoteIndex {
    sources: HashMap<String, SourceEntry>,
    blocks: HashMap<String, BlockEntry>,
}

impl NoteIndex {
    /// Load every note and block vector from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails or a stored blob is malformed.
    pub async fn load(store: &NoteStore) -> Result<Self> {
        let mut sources = HashMap::new();
        let mut blocks = HashMap::new();

        for note in store.all_notes().await? {
            let note_blocks = store.blocks_for(&note.path).await?;
            let mut block_keys = Vec::with_capacity(note_blocks.len());

            for block in note_blocks {
                block_keys.push(block.block_key.clone());
                blocks.insert(
                    Self::composite_key(&note.path, &block.block_key),
                    BlockEntry {
                        vector: block.embedding,
                        source_path: note.path.clone(),
                    },
                );
            }

            sources.insert(
                note.path,
                SourceEntry {
                    vector: note.embedding,
                    block_keys,
                },
            );
        }

        tracing::debug!(
            sources = sources.len(),
            blocks = blocks.len(),
            "note index loaded"
        );
        Ok(Self { sources, blocks })
    }

    /// Key of a block within the flat block map.
    #[must_use]
    pub fn composite_key(path: &str, block_key: &str) -> String {
        format!("{path}::{block_key}")
    }

    #[must_use]
    pub fn source(&self, path: &str) -> Option<&SourceEntry> {
        self.sources.get(path)
    }

    pub fn sources(&self) -> impl Iterator<Item = (&String, &SourceEntry)> {
        self.sources.iter()
    }

    #[must_use]
    pub fn block(&self, composite_key: &str) -> Option<&BlockEntry> {
        self.blocks.get(composite_key)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (&String, &BlockEntry)> {
        self.blocks.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
