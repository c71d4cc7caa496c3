//! Multi-level connection graph built by repeated nearest-neighbor expansion.

use std::collections::HashSet;

use serde::Serialize;

use crate::index::NoteIndex;
use crate::search::nearest;

/// One node of the connection tree. The root always carries score 1.0;
/// children carry the similarity measured from their parent's vector.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionNode {
    pub path: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<ConnectionNode>>,
}

/// Expand a connection tree from `path`.
///
/// A path visited on any branch is never revisited on a sibling branch, so no
/// path appears twice in the output. Returns `None` when `path` has no
/// indexed vector.
#[must_use]
pub fn build_graph(
    index: &NoteIndex,
    path: &str,
    max_depth: usize,
    max_per_level: usize,
    threshold: f32,
) -> Option<ConnectionNode> {
    let mut visited = HashSet::from([path.to_string()]);
    expand(index, path, 1.0, 0, max_depth, max_per_level, threshold, &mut visited)
}

#[expect(clippy::too_many_arguments)]
fn expand(
    index: &NoteIndex,
    path: &str,
    score: f32,
    depth: usize,
    max_depth: usize,
    max_per_level: usize,
    threshold: f32,
    visited: &mut HashSet<String>,
) -> Option<ConnectionNode> {
    let entry = index.source(path)?;

    if depth >= max_depth {
        return Some(ConnectionNode {
            path: path.to_string(),
            score,
            connections: None,
        });
    }

    // Over-fetch so visited-set filtering still leaves enough candidates.
    let fetch = max_per_level.saturating_mul(2).max(max_per_level + visited.len());
    let candidates: Vec<_> = nearest(index, &entry.vector, Some(path), fetch, threshold)
        .into_iter()
        .filter(|m| !visited.contains(&m.path))
        .take(max_per_level)
        .collect();

    // Claim every selected child before recursing so sibling subtrees
    // cannot pick it up again.
    for candidate in &candidates {
        visited.insert(candidate.path.clone());
    }

    let children: Vec<ConnectionNode> = candidates
        .into_iter()
        .filter_map(|candidate| {
            expand(
                index,
                &candidate.path,
                candidate.score,
                depth + 1,
                max_depth,
                max_per_level,
                threshold,
                visited,
            )
        })
        .collect();

    Some(ConnectionNode {
        path: path.to_string(),
        score,
        connections: if children.is_empty() {
            None
        } else {
            Some(children)
        },
    })
}
