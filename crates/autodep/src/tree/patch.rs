use std::cmp::Ordering;

use serde::Serialize;

use super::entry::{EntryKind, FileEntry, compare_paths, normalize_entries};

/// One step that moves a directory from its previous state to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PatchOp {
    Unlink { path: String },
    Rmdir { path: String },
    Mkdir { path: String },
    Change { path: String, entry: FileEntry },
    Create { path: String, entry: FileEntry },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Unlink { path }
            | PatchOp::Rmdir { path }
            | PatchOp::Mkdir { path }
            | PatchOp::Change { path, .. }
            | PatchOp::Create { path, .. } => path,
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, PatchOp::Unlink { .. } | PatchOp::Rmdir { .. })
    }

    fn removal(entry: &FileEntry) -> Self {
        let path = entry.path.clone();
        match entry.kind {
            EntryKind::File => PatchOp::Unlink { path },
            EntryKind::Directory => PatchOp::Rmdir { path },
        }
    }

    fn addition(entry: &FileEntry) -> Self {
        let path = entry.path.clone();
        match entry.kind {
            EntryKind::File => PatchOp::Create {
                path,
                entry: entry.clone(),
            },
            EntryKind::Directory => PatchOp::Mkdir { path },
        }
    }
}

/// Compute the ordered patch between two normalized listings.
///
/// Removals come first in reverse path order, so a directory's contents are
/// removed before the directory. Additions and changes follow in ascending
/// order, so a directory is created before its contents.
pub fn compute_patch(previous: &[FileEntry], next: &[FileEntry]) -> Vec<PatchOp> {
    let mut removals = Vec::new();
    let mut additions = Vec::new();

    let mut prev_iter = previous.iter().peekable();
    let mut next_iter = next.iter().peekable();

    loop {
        let order = match (prev_iter.peek(), next_iter.peek()) {
            (None, None) => break,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(old), Some(new)) => compare_paths(&old.path, &new.path),
        };

        match order {
            Ordering::Less => {
                if let Some(old) = prev_iter.next() {
                    removals.push(PatchOp::removal(old));
                }
            }
            Ordering::Greater => {
                if let Some(new) = next_iter.next() {
                    additions.push(PatchOp::addition(new));
                }
            }
            Ordering::Equal => {
                let (Some(old), Some(new)) = (prev_iter.next(), next_iter.next()) else {
                    break;
                };
                if old.kind != new.kind {
                    removals.push(PatchOp::removal(old));
                    additions.push(PatchOp::addition(new));
                } else if old.kind == EntryKind::File && old.token != new.token {
                    additions.push(PatchOp::Change {
                        path: new.path.clone(),
                        entry: new.clone(),
                    });
                }
            }
        }
    }

    removals.reverse();
    removals.extend(additions);
    removals
}

/// The last observed state of one directory.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<FileEntry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Diff `next` against the stored state and make it the new state.
    pub fn diff(&mut self, next: impl IntoIterator<Item = FileEntry>) -> Vec<PatchOp> {
        let pending = self.prepare(next);
        self.commit(pending.entries);
        pending.patch
    }

    /// Diff `next` against the stored state, leaving the state untouched.
    ///
    /// Callers [`commit`](Self::commit) the entries once the patch has been
    /// applied, so a failed apply is retried by the next diff.
    pub fn prepare(&self, next: impl IntoIterator<Item = FileEntry>) -> PendingPatch {
        let entries = normalize_entries(next);
        let patch = compute_patch(&self.entries, &entries);
        PendingPatch { entries, patch }
    }

    pub fn commit(&mut self, entries: Vec<FileEntry>) {
        self.entries = entries;
    }
}

/// A patch and the listing it leads to, not yet committed to a [`Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct PendingPatch {
    pub entries: Vec<FileEntry>,
    pub patch: Vec<PatchOp>,
}
