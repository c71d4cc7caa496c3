//! Cosine-similarity ranking over the in-memory index.

use serde::Serialize;

use crate::error::{IndexError, Result};
use crate::index::NoteIndex;

/// One ranked similarity result.
#[derive(Debug, Clone, Serialize)]
pub struct NoteMatch {
    pub path: String,
    pub score: f32,
    pub block_keys: Vec<String>,
}

/// Cosine similarity of two equal-length vectors; 0.0 when either magnitude
/// is zero, never NaN.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Rank every indexed note against `query`, keeping scores at or above
/// `threshold`, sorted descending, at most `limit` results.
///
/// The sort is stable, so equal scores keep a consistent order within one
/// process run.
#[must_use]
pub fn nearest(
    index: &NoteIndex,
    query: &[f32],
    exclude: Option<&str>,
    limit: usize,
    threshold: f32,
) -> Vec<NoteMatch> {
    let mut matches: Vec<NoteMatch> = index
        .sources()
        .filter(|(path, _)| exclude.is_none_or(|ex| path.as_str() != ex))
        .map(|(path, entry)| NoteMatch {
            path: path.clone(),
            score: cosine_similarity(query, &entry.vector),
            block_keys: entry.block_keys.clone(),
        })
        .filter(|m| m.score >= threshold)
        .collect();

    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(limit);
    matches
}

/// Notes most similar to the one at `path`, excluding the note itself.
///
/// # Errors
///
/// Returns [`IndexError::MissingVector`] when `path` has no indexed vector.
pub fn find_similar(
    index: &NoteIndex,
    path: &str,
    limit: usize,
    threshold: f32,
) -> Result<Vec<NoteMatch>> {
    let entry = index.source(path).ok_or_else(|| IndexError::MissingVector {
        path: path.to_string(),
    })?;
    Ok(nearest(index, &entry.vector, Some(path), limit, threshold))
}

/// Degraded substring fallback over paths and block keys, for callers that
/// have no query vector. Not a ranking feature: results carry score 0.0.
#[must_use]
pub fn keyword_fallback(index: &NoteIndex, query: &str, limit: usize) -> Vec<NoteMatch> {
    let needle = query.to_lowercase();
    let mut matches: Vec<NoteMatch> = index
        .sources()
        .filter(|(path, entry)| {
            path.to_lowercase().contains(&needle)
                || entry
                    .block_keys
                    .iter()
                    .any(|k| k.to_lowercase().contains(&needle))
        })
        .map(|(path, entry)| NoteMatch {
            path: path.clone(),
            score: 0.0,
            block_keys: entry.block_keys.clone(),
        })
        .collect();
    matches.sort_by(|a, b| a.path.cmp(&b.path));
    matches.truncate(limit);
    matches
}
