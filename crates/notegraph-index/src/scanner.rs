//! Tree walk and change classification against persisted state.

use std::collections::HashMap;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::error::Result;
use crate::store::NoteStore;

/// File extension eligible for indexing.
pub const NOTE_EXTENSION: &str = "md";

/// Directory names never descended into.
const DENIED_DIRS: &[&str] = &[".git", ".obsidian", ".trash", "node_modules"];

/// Classification of every known path for one scan invocation.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub new: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: usize,
}

impl ChangeSet {
    /// True when the scan found no work at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Walk `root` and classify every path against the store's persisted state.
///
/// Hidden entries and [`DENIED_DIRS`] are skipped; only `.md` files are
/// eligible. Modification-time comparison is exact equality, so any mtime
/// drift re-classifies a file as modified rather than risking a missed edit.
///
/// # Errors
///
/// Returns an error if the walk hits an unreadable entry (deletions cannot be
/// determined safely from a partial walk) or if the store query fails.
pub async fn scan_changes(root: &Path, store: &NoteStore) -> Result<ChangeSet> {
    let disk = walk_notes(root)?;
    let known = store.note_mtimes().await?;

    let mut changes = ChangeSet::default();

    for (path, mtime) in &disk {
        match known.get(path) {
            None => changes.new.push(path.clone()),
            Some(stored) if stored == mtime => changes.unchanged += 1,
            Some(_) => changes.modified.push(path.clone()),
        }
    }

    for path in known.keys() {
        if !disk.contains_key(path) {
            changes.deleted.push(path.clone());
        }
    }

    Ok(changes)
}

/// Enumerate eligible files under `root` with their mtimes in milliseconds.
fn walk_notes(root: &Path) -> Result<HashMap<String, i64>> {
    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !DENIED_DIRS.contains(&name))
        })
        .build();

    let mut disk = HashMap::new();
    for result in walker {
        let entry = result?;
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some(NOTE_EXTENSION) {
            continue;
        }

        let metadata = entry.metadata()?;
        let mtime = metadata
            .modified()
            .map(mtime_ms)
            .map_err(crate::error::IndexError::Io)?;

        disk.insert(normalize_path(root, entry.path()), mtime);
    }

    Ok(disk)
}

/// POSIX-style relative form of `path` under `root`.
#[must_use]
pub fn normalize_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a watcher event path is worth indexing at all.
#[must_use]
pub fn is_eligible(path: &Path) -> bool {
    if path.extension().and_then(|e| e.to_str()) != Some(NOTE_EXTENSION) {
        return false;
    }
    !path.components().any(|c| {
        c.as_os_str().to_str().is_some_and(|name| {
            DENIED_DIRS.contains(&name) || (name.starts_with('.') && name.len() > 1 && name != "..")
        })
    })
}

fn mtime_ms(time: std::time::SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NoteRecord, now_ms};

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    async fn record_as_on_disk(store: &NoteStore, root: &Path, rel: &str) {
        let mtime = mtime_ms(std::fs::metadata(root.join(rel)).unwrap().modified().unwrap());
        store
            .upsert_note(&NoteRecord {
                path: rel.into(),
                content_hash: "h".into(),
                mtime,
                embedding: vec![0.0],
                model: "m".into(),
                updated_at: now_ms(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fresh_tree_classifies_everything_as_new() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", "a");
        write(dir.path(), "sub/b.md", "b");
        let store = NoteStore::new(":memory:").await.unwrap();

        let changes = scan_changes(dir.path(), &store).await.unwrap();
        let mut new = changes.new.clone();
        new.sort();
        assert_eq!(new, vec!["a.md", "sub/b.md"]);
        assert!(changes.modified.is_empty());
        assert!(changes.deleted.is_empty());
        assert_eq!(changes.unchanged, 0);
    }

    #[tokio::test]
    async fn matching_mtime_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", "a");
        let store = NoteStore::new(":memory:").await.unwrap();
        record_as_on_disk(&store, dir.path(), "a.md").await;

        let changes = scan_changes(dir.path(), &store).await.unwrap();
        assert!(changes.is_empty());
        assert_eq!(changes.unchanged, 1);
    }

    #[tokio::test]
    async fn mtime_drift_classifies_as_modified() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", "a");
        let store = NoteStore::new(":memory:").await.unwrap();
        store
            .upsert_note(&NoteRecord {
                path: "a.md".into(),
                content_hash: "h".into(),
                mtime: 1, // never matches a real mtime
                embedding: vec![0.0],
                model: "m".into(),
                updated_at: now_ms(),
            })
            .await
            .unwrap();

        let changes = scan_changes(dir.path(), &store).await.unwrap();
        assert_eq!(changes.modified, vec!["a.md"]);
    }

    #[tokio::test]
    async fn store_only_path_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let store = NoteStore::new(":memory:").await.unwrap();
        store
            .upsert_note(&NoteRecord {
                path: "gone.md".into(),
                content_hash: "h".into(),
                mtime: 1,
                embedding: vec![0.0],
                model: "m".into(),
                updated_at: now_ms(),
            })
            .await
            .unwrap();

        let changes = scan_changes(dir.path(), &store).await.unwrap();
        assert_eq!(changes.deleted, vec!["gone.md"]);
    }

    #[tokio::test]
    async fn classification_is_a_partition() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "new.md", "n");
        write(dir.path(), "same.md", "s");
        write(dir.path(), "changed.md", "c");
        let store = NoteStore::new(":memory:").await.unwrap();
        record_as_on_disk(&store, dir.path(), "same.md").await;
        store
            .upsert_note(&NoteRecord {
                path: "changed.md".into(),
                content_hash: "h".into(),
                mtime: 1,
                embedding: vec![0.0],
                model: "m".into(),
                updated_at: now_ms(),
            })
            .await
            .unwrap();
        store
            .upsert_note(&NoteRecord {
                path: "gone.md".into(),
                content_hash: "h".into(),
                mtime: 1,
                embedding: vec![0.0],
                model: "m".into(),
                updated_at: now_ms(),
            })
            .await
            .unwrap();

        let changes = scan_changes(dir.path(), &store).await.unwrap();
        let total = changes.new.len() + changes.modified.len() + changes.deleted.len()
            + changes.unchanged;
        assert_eq!(total, 4); // union of disk paths and store paths
        assert_eq!(changes.new, vec!["new.md"]);
        assert_eq!(changes.modified, vec!["changed.md"]);
        assert_eq!(changes.deleted, vec!["gone.md"]);
        assert_eq!(changes.unchanged, 1);
    }

    #[tokio::test]
    async fn denied_and_hidden_dirs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "keep.md", "k");
        write(dir.path(), ".obsidian/skip.md", "s");
        write(dir.path(), "node_modules/skip.md", "s");
        write(dir.path(), ".hidden/skip.md", "s");
        write(dir.path(), "notes.txt", "not a note");
        let store = NoteStore::new(":memory:").await.unwrap();

        let changes = scan_changes(dir.path(), &store).await.unwrap();
        assert_eq!(changes.new, vec!["keep.md"]);
    }

    #[test]
    fn normalize_uses_forward_slashes() {
        let root = Path::new("/vault");
        let normalized = normalize_path(root, &root.join("dir").join("note.md"));
        assert_eq!(normalized, "dir/note.md");
    }

    #[test]
    fn eligibility_filter() {
        assert!(is_eligible(Path::new("/vault/a.md")));
        assert!(is_eligible(Path::new("/vault/sub/b.md")));
        assert!(!is_eligible(Path::new("/vault/a.txt")));
        assert!(!is_eligible(Path::new("/vault/.obsidian/a.md")));
        assert!(!is_eligible(Path::new("/vault/node_modules/a.md")));
        assert!(!is_eligible(Path::new("/vault/.hidden/a.md")));
    }
}
