//! Error types for notegraph-index.

use std::num::TryFromIntError;

/// Errors that can occur during indexing and query operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading note files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// `SQLite` database error.
    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// Database migration error.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Directory walk error during a scan.
    #[error("scan error: {0}")]
    Walk(#[from] ignore::Error),

    /// Embedding service error.
    #[error("embedding error: {0}")]
    Embed(#[from] notegraph_embed::EmbedError),

    /// File watcher error.
    #[error("watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// Stored embedding blob has an invalid length.
    #[error("embedding blob length {len} is not a multiple of 4")]
    Codec { len: usize },

    /// A query named a path that has no indexed vector.
    #[error("no embedding indexed for {path}")]
    MissingVector { path: String },

    /// Integer conversion error.
    #[error("integer conversion failed: {0}")]
    IntConversion(#[from] TryFromIntError),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
