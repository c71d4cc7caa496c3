//! Indexing pipeline: scan → parse → embed (batched) → store.

use std::path::Path;
use std::time::Instant;

use notegraph_embed::EmbedProvider;

use crate::error::Result;
use crate::parser::{ParsedNote, parse_note};
use crate::scanner::scan_changes;
use crate::store::{BlockRecord, NoteRecord, NoteStore, now_ms};

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of texts per embedding-service call.
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { batch_size: 32 }
    }
}

/// Aggregate counts for one pipeline run.
#[derive(Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct PipelineStats {
    /// Files embedded and saved.
    pub processed: usize,
    /// Files whose embedding or save failed.
    pub failed: usize,
    /// Files removed from the store.
    pub deleted: usize,
    /// Files skipped because their canonical text was empty.
    pub skipped: usize,
    pub duration_ms: u64,
}

/// Per-file progress notification.
pub type ProgressFn<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// A parsed note waiting for its embedding batch to flush.
struct PendingNote {
    path: String,
    mtime: i64,
    parsed: ParsedNote,
}

impl PendingNote {
    /// One text for the note itself plus one per block.
    fn text_count(&self) -> usize {
        1 + self.parsed.blocks.len()
    }
}

/// Run the full incremental pipeline over `root`.
///
/// Deletions are applied first; new and modified files are parsed and their
/// texts accumulated into embedding batches of at most `batch_size` texts.
/// Per-file save failures and whole-batch embedding failures are counted,
/// logged, and never abort the run.
///
/// # Errors
///
/// Returns an error only if the initial scan or store enumeration fails;
/// everything after that degrades to counts in the returned stats.
pub async fn run_pipeline<P: EmbedProvider>(
    root: &Path,
    store: &NoteStore,
    provider: &P,
    config: &PipelineConfig,
    progress: Option<&ProgressFn<'_>>,
) -> Result<PipelineStats> {
    let start = Instant::now();
    let mut stats = PipelineStats::default();

    let changes = scan_changes(root, store).await?;
    tracing::info!(
        new = changes.new.len(),
        modified = changes.modified.len(),
        deleted = changes.deleted.len(),
        unchanged = changes.unchanged,
        "pipeline run started"
    );

    for path in &changes.deleted {
        match store.delete_note(path).await {
            Ok(_) => {
                stats.deleted += 1;
                notify(progress, path);
            }
            Err(e) => {
                tracing::warn!(path = %path, "delete failed: {e}");
                stats.failed += 1;
            }
        }
    }

    let mut batch: Vec<PendingNote> = Vec::new();
    let mut batch_texts = 0usize;

    for path in changes.new.iter().chain(&changes.modified) {
        let pending = match prepare_note(root, path).await {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                stats.skipped += 1;
                notify(progress, path);
                continue;
            }
            Err(e) => {
                tracing::warn!(path = %path, "read or parse failed: {e}");
                stats.failed += 1;
                notify(progress, path);
                continue;
            }
        };

        // Flush before this file's texts would push the batch past the cap.
        if !batch.is_empty() && batch_texts + pending.text_count() > config.batch_size {
            flush_batch(store, provider, &mut batch, progress, &mut stats).await;
            batch_texts = 0;
        }

        batch_texts += pending.text_count();
        batch.push(pending);
    }

    if !batch.is_empty() {
        flush_batch(store, provider, &mut batch, progress, &mut stats).await;
    }

    stats.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::info!(
        processed = stats.processed,
        failed = stats.failed,
        deleted = stats.deleted,
        skipped = stats.skipped,
        duration_ms = stats.duration_ms,
        "pipeline run finished"
    );
    Ok(stats)
}

/// Re-embed a single file, replacing its record and block set.
///
/// Returns `false` when the file was skipped because its canonical text is
/// empty. Used by the live watcher.
///
/// # Errors
///
/// Returns an error if reading, embedding, or saving fails.
pub async fn reindex_file<P: EmbedProvider>(
    root: &Path,
    store: &NoteStore,
    provider: &P,
    rel_path: &str,
) -> Result<bool> {
    let Some(pending) = prepare_note(root, rel_path).await? else {
        tracing::debug!(path = %rel_path, "skipped empty note");
        return Ok(false);
    };

    let texts = note_texts(&pending);
    let vectors = provider.embed_batch(&texts).await?;
    save_note(store, provider.model(), &pending, &vectors).await?;
    Ok(true)
}

/// Remove a single file from the store. Returns the number of notes removed.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub async fn remove_file(store: &NoteStore, rel_path: &str) -> Result<u64> {
    store.delete_note(rel_path).await
}

/// Read and parse a note; `None` when its canonical text is empty.
async fn prepare_note(root: &Path, rel_path: &str) -> Result<Option<PendingNote>> {
    let abs = root.join(rel_path);
    let raw = tokio::fs::read_to_string(&abs).await?;
    let metadata = tokio::fs::metadata(&abs).await?;
    let mtime = metadata
        .modified()?
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX));

    let parsed = parse_note(&raw);
    if parsed.content.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(PendingNote {
        path: rel_path.to_string(),
        mtime,
        parsed,
    }))
}

/// Embedding inputs for one file: full text first, then each block in order.
fn note_texts(pending: &PendingNote) -> Vec<String> {
    let mut texts = Vec::with_capacity(pending.text_count());
    texts.push(pending.parsed.content.clone());
    texts.extend(pending.parsed.blocks.iter().map(|b| b.text.clone()));
    texts
}

/// Embed and persist every file in the batch; drains it.
///
/// A failed embedding call fails the whole batch; a failed save fails only
/// that file. Neither propagates.
async fn flush_batch<P: EmbedProvider>(
    store: &NoteStore,
    provider: &P,
    batch: &mut Vec<PendingNote>,
    progress: Option<&ProgressFn<'_>>,
    stats: &mut PipelineStats,
) {
    let texts: Vec<String> = batch.iter().flat_map(|p| note_texts(p)).collect();

    let vectors = match provider.embed_batch(&texts).await {
        Ok(vectors) if vectors.len() == texts.len() => vectors,
        Ok(vectors) => {
            tracing::warn!(
                sent = texts.len(),
                received = vectors.len(),
                "embedding batch returned wrong vector count"
            );
            stats.failed += batch.len();
            for pending in batch.drain(..) {
                notify(progress, &pending.path);
            }
            return;
        }
        Err(e) => {
            tracing::warn!(files = batch.len(), "embedding batch failed: {e}");
            stats.failed += batch.len();
            for pending in batch.drain(..) {
                notify(progress, &pending.path);
            }
            return;
        }
    };

    let mut cursor = 0usize;
    for pending in batch.drain(..) {
        let slice = &vectors[cursor..cursor + pending.text_count()];
        cursor += pending.text_count();

        match save_note(store, provider.model(), &pending, slice).await {
            Ok(()) => stats.processed += 1,
            Err(e) => {
                tracing::warn!(path = %pending.path, "save failed: {e}");
                stats.failed += 1;
            }
        }
        notify(progress, &pending.path);
    }
}

/// Persist one file: note record first, then its full block set.
async fn save_note(
    store: &NoteStore,
    model: &str,
    pending: &PendingNote,
    vectors: &[Vec<f32>],
) -> Result<()> {
    let record = NoteRecord {
        path: pending.path.clone(),
        content_hash: pending.parsed.content_hash.clone(),
        mtime: pending.mtime,
        embedding: vectors[0].clone(),
        model: model.to_string(),
        updated_at: now_ms(),
    };
    store.upsert_note(&record).await?;

    let blocks: Vec<BlockRecord> = pending
        .parsed
        .blocks
        .iter()
        .zip(&vectors[1..])
        .map(|(block, vector)| BlockRecord {
            source_path: pending.path.clone(),
            block_key: block.key.clone(),
            embedding: vector.clone(),
            line_start: i64::try_from(block.line_start).unwrap_or(i64::MAX),
            line_end: i64::try_from(block.line_end).unwrap_or(i64::MAX),
        })
        .collect();
    store.replace_blocks(&pending.path, &blocks).await?;

    tracing::debug!(path = %pending.path, blocks = blocks.len(), "note saved");
    Ok(())
}

fn notify(progress: Option<&ProgressFn<'_>>, path: &str) {
    if let Some(f) = progress {
        f(path);
    }
}
