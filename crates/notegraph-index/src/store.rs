//! `SQLite`-backed persistent vector store for notes and blocks.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::codec;
use crate::error::Result;

/// Persisted record for one note.
#[derive(Debug, Clone)]
pub struct NoteRecord {
    /// Relative, forward-slash normalized path; unique key.
    pub path: String,
    /// Hex blake3 hash of the canonical full text.
    pub content_hash: String,
    /// Last observed on-disk modification time, milliseconds.
    pub mtime: i64,
    pub embedding: Vec<f32>,
    /// Identifier of the embedding model that produced `embedding`.
    pub model: String,
    /// Unix milliseconds of the last write.
    pub updated_at: i64,
}

/// Persisted record for one block of a note.
#[derive(Debug, Clone)]
pub struct BlockRecord {
    pub source_path: String,
    pub block_key: String,
    pub embedding: Vec<f32>,
    /// 1-indexed inclusive.
    pub line_start: i64,
    pub line_end: i64,
}

/// Single source of truth for indexed vectors; one db file, two tables.
#[derive(Debug, Clone)]
pub struct NoteStore {
    pool: SqlitePool,
}

impl NoteStore {
    /// Open (or create) the `SQLite` database and run migrations.
    ///
    /// Enables foreign key constraints at connection level so that deleting a
    /// note cascades to its blocks, and WAL journal mode so watcher writes and
    /// bulk pipeline writes can interleave with readers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub async fn new(path: &str) -> Result<Self> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let opts = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        sqlx::migrate!("../../migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Expose the underlying pool for shared access.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or fully replace the record for a path.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn upsert_note(&self, record: &NoteRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO notes (path, content_hash, mtime, embedding, model, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(path) DO UPDATE SET \
             content_hash = excluded.content_hash, mtime = excluded.mtime, \
             embedding = excluded.embedding, model = excluded.model, \
             updated_at = excluded.updated_at",
        )
        .bind(&record.path)
        .bind(&record.content_hash)
        .bind(record.mtime)
        .bind(codec::encode(&record.embedding))
        .bind(&record.model)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails or a stored blob is malformed.
    pub async fn get_note(&self, path: &str) -> Result<Option<NoteRecord>> {
        let row: Option<NoteRow> = sqlx::query_as(
            "SELECT path, content_hash, mtime, embedding, model, updated_at \
             FROM notes WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        row.map(note_from_row).transpose()
    }

    /// All note records, for building the in-memory index.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored blob is malformed.
    pub async fn all_notes(&self) -> Result<Vec<NoteRecord>> {
        let rows: Vec<NoteRow> = sqlx::query_as(
            "SELECT path, content_hash, mtime, embedding, model, updated_at FROM notes",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(note_from_row).collect()
    }

    /// Known paths and their recorded mtimes, for change scanning.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn note_mtimes(&self) -> Result<HashMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT path, mtime FROM notes")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    /// Delete a note; its blocks are removed by the foreign-key cascade.
    ///
    /// Returns the number of note rows removed (0 or 1).
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn delete_note(&self, path: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notes WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_notes(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notes")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Atomically replace the whole block set for a path.
    ///
    /// Runs as a single transaction: a concurrent reader sees either the prior
    /// set or the new set, never a mix.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement in the transaction fails.
    pub async fn replace_blocks(&self, path: &str, blocks: &[BlockRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM blocks WHERE source_path = ?")
            .bind(path)
            .execute(&mut *tx)
            .await?;

        for block in blocks {
            sqlx::query(
                "INSERT INTO blocks (source_path, block_key, embedding, line_start, line_end) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(path)
            .bind(&block.block_key)
            .bind(codec::encode(&block.embedding))
            .bind(block.line_start)
            .bind(block.line_end)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Blocks of a note, ordered by `line_start`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored blob is malformed.
    pub async fn blocks_for(&self, path: &str) -> Result<Vec<BlockRecord>> {
        let rows: Vec<(String, String, Vec<u8>, i64, i64)> = sqlx::query_as(
            "SELECT source_path, block_key, embedding, line_start, line_end \
             FROM blocks WHERE source_path = ? ORDER BY line_start",
        )
        .bind(path)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(source_path, block_key, embedding, line_start, line_end)| {
                Ok(BlockRecord {
                    source_path,
                    block_key,
                    embedding: codec::decode(&embedding)?,
                    line_start,
                    line_end,
                })
            })
            .collect()
    }
}

type NoteRow = (String, String, i64, Vec<u8>, String, i64);

fn note_from_row((path, content_hash, mtime, embedding, model, updated_at): NoteRow) -> Result<NoteRecord> {
    Ok(NoteRecord {
        path,
        content_hash,
        mtime,
        embedding: codec::decode(&embedding)?,
        model,
        updated_at,
    })
}

/// Current wall-clock time as unix milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
