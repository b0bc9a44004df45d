//! Recursive file watcher feeding a tokio channel.
//!
//! Debouncing happens on the receiving side, in the watch command.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::{CliError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Keeps the underlying watcher alive; dropping it stops the events.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Watch `root` recursively, skipping anything under `ignored` and
    /// hidden paths.
    pub fn new(root: PathBuf, ignored: Vec<PathBuf>) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.is_dir() {
            return Err(CliError::DirectoryNotFound(root));
        }

        let (tx, rx) = mpsc::channel(256);
        let filter_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else { return };
            for path in &event.paths {
                if should_ignore(path, &filter_root, &ignored) {
                    continue;
                }
                let change = match event.kind {
                    EventKind::Create(_) => FileChange::Created(path.clone()),
                    EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };
                // receiver gone means the command is shutting down
                let _ = tx.blocking_send(change);
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((Self { _watcher: watcher, root }, rx))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn should_ignore(path: &Path, root: &Path, ignored: &[PathBuf]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };
    if ignored.iter().any(|dir| path.starts_with(dir)) {
        return true;
    }
    relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_outputs_and_hidden() {
        let root = PathBuf::from("/project");
        let ignored = vec![
            PathBuf::from("/project/node_modules"),
            PathBuf::from("/project/dist/autodep-deps.json"),
        ];

        assert!(should_ignore(Path::new("/project/node_modules/x/index.js"), &root, &ignored));
        assert!(should_ignore(Path::new("/project/dist/autodep-deps.json"), &root, &ignored));
        assert!(should_ignore(Path::new("/project/.git/HEAD"), &root, &ignored));
        assert!(should_ignore(Path::new("/elsewhere/a.js"), &root, &ignored));
        assert!(!should_ignore(Path::new("/project/app/app.js"), &root, &ignored));
    }
}
