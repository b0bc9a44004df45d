use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use super::cache::Cached;
use super::import::{Import, ParsedImport};
use super::parser::{ModuleParser, ParseError};
use crate::concurrency::{TaskError, default_concurrency, map_bounded};
use crate::package::Package;
use crate::runtime::{Runtime, RuntimeError};
use crate::tree::{FileEntry, PatchOp, Snapshot};

/// Errors that abort analysis of a tree.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Where a source tree lives and how its files are labelled.
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Directory the patch paths are relative to.
    pub tree_root: PathBuf,
    /// Prepended to relative paths to form `source_file`, e.g. `"app/"`.
    pub path_prefix: String,
    /// Label such as `"app"` or `"tests"` consulted by bundle policies.
    pub tree_kind: Option<String>,
    pub max_concurrency: usize,
}

impl AnalyzerOptions {
    pub fn new(tree_root: impl Into<PathBuf>) -> Self {
        Self {
            tree_root: tree_root.into(),
            path_prefix: String::new(),
            tree_kind: None,
            max_concurrency: default_concurrency(),
        }
    }

    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    pub fn with_tree_kind(mut self, kind: impl Into<String>) -> Self {
        self.tree_kind = Some(kind.into());
        self
    }
}

/// Tracks the imports of one source tree across patches.
///
/// Each file's import list is cached; the flattened list over all files is
/// rebuilt only after some file's list actually changed, so callers can
/// detect "nothing changed" with `Arc::ptr_eq` on [`Analyzer::imports`].
#[derive(Debug)]
pub struct Analyzer {
    package: Arc<Package>,
    options: AnalyzerOptions,
    runtime: Arc<dyn Runtime>,
    parser: Arc<dyn ModuleParser>,
    snapshot: Snapshot,
    per_file: BTreeMap<String, Vec<Import>>,
    aggregate: Cached<Arc<[Import]>>,
}

impl Analyzer {
    pub fn new(
        package: Arc<Package>,
        options: AnalyzerOptions,
        runtime: Arc<dyn Runtime>,
        parser: Arc<dyn ModuleParser>,
    ) -> Self {
        Self {
            package,
            options,
            runtime,
            parser,
            snapshot: Snapshot::new(),
            per_file: BTreeMap::new(),
            aggregate: Cached::new(),
        }
    }

    pub fn package(&self) -> &Arc<Package> {
        &self.package
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Diff a fresh listing of the tree against the last one and apply it.
    ///
    /// The listing is only remembered once the patch applied cleanly, so a
    /// failing file fails again on the next update.
    pub async fn update(
        &mut self,
        listing: impl IntoIterator<Item = FileEntry>,
    ) -> Result<(), AnalyzeError> {
        let pending = self.snapshot.prepare(listing);
        self.on_patch(&pending.patch).await?;
        self.snapshot.commit(pending.entries);
        Ok(())
    }

    /// Apply one patch of the source tree.
    ///
    /// Removed files drop their imports. Created and changed files are read
    /// and parsed concurrently; a file only invalidates the aggregate when its
    /// import list differs from the cached one.
    pub async fn on_patch(&mut self, patch: &[PatchOp]) -> Result<(), AnalyzeError> {
        let mut to_parse = Vec::new();

        for op in patch {
            let path = op.path();
            if !self.package.matches_extension(path) {
                continue;
            }
            match op {
                PatchOp::Unlink { .. } => {
                    if self.per_file.remove(path).is_some() {
                        self.aggregate.invalidate();
                    }
                }
                PatchOp::Create { .. } | PatchOp::Change { .. } => {
                    let source_file = format!("{}{}", self.options.path_prefix, path);
                    to_parse.push((path.to_string(), source_file));
                }
                PatchOp::Rmdir { .. } | PatchOp::Mkdir { .. } => {}
            }
        }

        if to_parse.is_empty() {
            return Ok(());
        }

        let root = self.options.tree_root.clone();
        let runtime = Arc::clone(&self.runtime);
        let parser = Arc::clone(&self.parser);
        let parsed = map_bounded(
            to_parse,
            self.options.max_concurrency,
            move |(path, source_file)| {
                let file = root.join(&path);
                let runtime = Arc::clone(&runtime);
                let parser = Arc::clone(&parser);
                async move {
                    let result =
                        parse_file(runtime.as_ref(), parser.as_ref(), &file, &source_file).await;
                    (path, source_file, result)
                }
            },
        )
        .await?;

        for (path, source_file, result) in parsed {
            let parsed = match result {
                Ok(parsed) => parsed,
                Err(AnalyzeError::Parse(err)) if err.is_syntax() => {
                    warn!(file = %source_file, error = %err, "skipping file with syntax errors");
                    Vec::new()
                }
                Err(err) => return Err(err),
            };

            let imports: Vec<Import> = parsed
                .into_iter()
                .map(|p| {
                    Import::from_parsed(
                        p,
                        &source_file,
                        &self.package,
                        self.options.tree_kind.as_deref(),
                    )
                })
                .collect();

            let previous = self.per_file.get(&path).map(Vec::as_slice).unwrap_or(&[]);
            if previous == imports.as_slice() {
                continue;
            }

            debug!(file = %source_file, count = imports.len(), "imports changed");
            if imports.is_empty() {
                self.per_file.remove(&path);
            } else {
                self.per_file.insert(path, imports);
            }
            self.aggregate.invalidate();
        }

        Ok(())
    }

    /// Every import of the tree, in path order.
    ///
    /// Returns the same `Arc` until some file's imports change.
    pub fn imports(&mut self) -> Arc<[Import]> {
        let per_file = &self.per_file;
        Arc::clone(
            self.aggregate
                .get_or_compute(|| per_file.values().flatten().cloned().collect()),
        )
    }
}

async fn parse_file(
    runtime: &dyn Runtime,
    parser: &dyn ModuleParser,
    file: &Path,
    path: &str,
) -> Result<Vec<ParsedImport>, AnalyzeError> {
    let source = runtime.read_to_string(file).await.map_err(|e| match e {
        RuntimeError::InvalidUtf8 { reason, .. } => AnalyzeError::Parse(ParseError::InvalidSource {
            path: path.to_string(),
            reason,
        }),
        source => AnalyzeError::Read {
            path: file.to_path_buf(),
            source,
        },
    })?;
    Ok(parser.parse(path, &source)?)
}
