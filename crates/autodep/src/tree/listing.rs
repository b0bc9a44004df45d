use std::path::Path;

use serde::{Deserialize, Serialize};

use super::entry::{ChangeToken, FileEntry, normalize_entries};
use crate::runtime::{Runtime, RuntimeResult};

/// How change tokens are computed for listed files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenMode {
    /// Size and modification time. Cheap, no reads.
    #[default]
    Stat,
    /// BLAKE3 hash of the file content.
    Content,
}

/// Options for [`list_tree`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListOptions {
    pub token_mode: TokenMode,
    /// Directory or file names skipped at any depth.
    pub ignore: Vec<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            token_mode: TokenMode::Stat,
            ignore: vec!["node_modules".to_string(), ".git".to_string()],
        }
    }
}

/// List every file and directory below `root`.
///
/// Paths are relative to `root` with `/` separators, sorted component-wise.
/// A missing root lists as empty so that trees can appear and disappear
/// between builds.
pub async fn list_tree(
    runtime: &dyn Runtime,
    root: &Path,
    options: &ListOptions,
) -> RuntimeResult<Vec<FileEntry>> {
    if !runtime.is_dir(root).await {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    let mut pending: Vec<String> = vec![String::new()];

    while let Some(relative) = pending.pop() {
        let dir = if relative.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&relative)
        };

        for name in runtime.read_dir(&dir).await? {
            if options.ignore.iter().any(|ignored| ignored == &name) {
                continue;
            }

            let child = if relative.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", relative, name)
            };
            let path = dir.join(&name);

            let metadata = match runtime.metadata(&path).await {
                Ok(metadata) => metadata,
                // removed between read_dir and stat
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };

            if metadata.is_dir {
                entries.push(FileEntry::directory(child.clone()));
                pending.push(child);
            } else if metadata.is_file {
                let token = match options.token_mode {
                    TokenMode::Stat => ChangeToken::Stat {
                        size: metadata.size,
                        modified: metadata.modified,
                    },
                    TokenMode::Content => ChangeToken::for_content(&runtime.read_file(&path).await?),
                };
                entries.push(FileEntry::file(child, token));
            }
        }
    }

    Ok(normalize_entries(entries))
}
