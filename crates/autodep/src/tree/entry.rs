use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Whether a listed path is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// Opaque value that changes whenever a file's content may have changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeToken {
    /// Size plus modification time in milliseconds.
    Stat { size: u64, modified: Option<u64> },
    /// Hex-encoded BLAKE3 digest of the content.
    Content { hash: String },
    /// Directories carry no change information.
    Directory,
}

impl ChangeToken {
    /// Token for the given content, hashed with BLAKE3.
    pub fn for_content(content: &[u8]) -> Self {
        ChangeToken::Content {
            hash: blake3::hash(content).to_hex().to_string(),
        }
    }
}

/// One entry of a directory listing.
///
/// `path` is relative to the listed root and always uses `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub kind: EntryKind,
    pub token: ChangeToken,
}

impl FileEntry {
    pub fn file(path: impl Into<String>, token: ChangeToken) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
            token,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
            token: ChangeToken::Directory,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Extension of the final path component, without the dot.
    pub fn extension(&self) -> Option<&str> {
        path_extension(&self.path)
    }
}

/// Extension of the final component of a `/`-separated path.
pub fn path_extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

/// Orders paths component by component.
///
/// Comparing components instead of raw strings keeps a directory directly
/// followed by its contents: `a`, `a/b`, `a-c` rather than `a`, `a-c`, `a/b`.
pub fn compare_paths(a: &str, b: &str) -> Ordering {
    a.split('/').cmp(b.split('/'))
}

/// Sort entries by path and drop duplicates, keeping the later entry.
pub fn normalize_entries(entries: impl IntoIterator<Item = FileEntry>) -> Vec<FileEntry> {
    let mut entries: Vec<FileEntry> = entries.into_iter().collect();
    // stable: equal paths keep their input order
    entries.sort_by(|a, b| compare_paths(&a.path, &b.path));

    let mut normalized: Vec<FileEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match normalized.last_mut() {
            Some(last) if last.path == entry.path => *last = entry,
            _ => normalized.push(entry),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(size: u64) -> ChangeToken {
        ChangeToken::Stat {
            size,
            modified: Some(1),
        }
    }

    #[test]
    fn directory_contents_follow_directory() {
        let entries = normalize_entries(vec![
            FileEntry::file("a-c.js", stat(1)),
            FileEntry::file("a/b.js", stat(1)),
            FileEntry::directory("a"),
        ]);
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "a/b.js", "a-c.js"]);
    }

    #[test]
    fn later_duplicate_wins() {
        let entries = normalize_entries(vec![
            FileEntry::file("x.js", stat(1)),
            FileEntry::file("y.js", stat(1)),
            FileEntry::file("x.js", stat(2)),
        ]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].token, stat(2));
    }

    #[test]
    fn extension_of_last_component() {
        assert_eq!(path_extension("a/b/c.min.js"), Some("js"));
        assert_eq!(path_extension("a.d/README"), None);
        assert_eq!(path_extension(".eslintrc"), None);
    }

    #[test]
    fn content_tokens_track_bytes() {
        assert_eq!(ChangeToken::for_content(b"a"), ChangeToken::for_content(b"a"));
        assert_ne!(ChangeToken::for_content(b"a"), ChangeToken::for_content(b"b"));
    }
}
