//! Incremental merge of generated bundles into upstream build output.
//!
//! The engine keeps a snapshot of the upstream tree and of the generated
//! tree. Each [`AppendEngine::build`] diffs both, mirrors upstream changes
//! into the output tree and regenerates only the merge targets whose
//! upstream file or generated fragments changed.
//!
//! ```text
//! upstream/assets/vendor.js ─┐
//!                            ├─▶ output/assets/vendor.js
//! generated/app/*.js ────────┘      (upstream + fragments + source map comment)
//! generated/lazy/** ────────────▶ output/assets/lazy/**   (passthrough)
//! ```

mod options;
mod sourcemap;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

pub use options::{AppendOptions, MergeSource};
pub use sourcemap::{separator_for, splice};

use crate::runtime::{Runtime, RuntimeError};
use crate::tree::{FileEntry, PatchOp, Snapshot, list_tree, path_extension};
use options::trim_slashes;

#[derive(Debug, thiserror::Error)]
pub enum AppendError {
    #[error("Failed to {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

fn io(action: &'static str, path: &Path) -> impl FnOnce(RuntimeError) -> AppendError {
    let path = path.to_path_buf();
    move |source| AppendError::Io {
        action,
        path,
        source,
    }
}

/// What one build did to the output tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendSummary {
    /// Files copied from upstream or passthrough sources.
    pub written: usize,
    /// Files and directories removed from the output.
    pub removed: usize,
    /// Merge targets rebuilt from upstream plus fragments.
    pub regenerated: usize,
    pub directories_created: usize,
}

impl AppendSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Merges a generated tree into an upstream tree, incrementally.
#[derive(Debug)]
pub struct AppendEngine {
    options: AppendOptions,
    runtime: Arc<dyn Runtime>,
    upstream: Snapshot,
    generated: Snapshot,
    targets: BTreeMap<String, MergeSource>,
    /// Subdirectory → extension → targets it feeds.
    feeds: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl AppendEngine {
    pub fn new(options: AppendOptions, runtime: Arc<dyn Runtime>) -> Self {
        let targets = options.merge_targets();
        let mut feeds: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
        for (target, source) in &targets {
            feeds
                .entry(source.subdir.clone())
                .or_default()
                .entry(source.extension.clone())
                .or_default()
                .push(target.clone());
        }

        Self {
            options,
            runtime,
            upstream: Snapshot::new(),
            generated: Snapshot::new(),
            targets,
            feeds,
        }
    }

    pub fn options(&self) -> &AppendOptions {
        &self.options
    }

    /// Bring the output tree up to date with both inputs.
    pub async fn build(&mut self) -> Result<AppendSummary, AppendError> {
        let runtime = self.runtime.as_ref();
        let list_options = &self.options.list_options;
        let (generated_listing, upstream_listing) = tokio::try_join!(
            list_tree(runtime, &self.options.generated_dir, list_options),
            list_tree(runtime, &self.options.upstream_dir, list_options),
        )?;

        runtime
            .create_dir(&self.options.output_dir, true)
            .await
            .map_err(io("create directory", &self.options.output_dir))?;

        let mut summary = AppendSummary::default();

        // Generated side: which merge targets have new fragments.
        let (passthrough_entries, relocated) = self.relocate_passthrough(&generated_listing);
        let generated = self.generated.prepare(generated_listing);
        let mut needs_update = BTreeSet::new();
        for op in &generated.patch {
            let path = op.path();
            if let Some(prefix) = longest_prefix(self.options.passthrough.keys(), path) {
                debug!(path, prefix, "passthrough change");
            }
            let Some(subdir) = longest_prefix(self.feeds.keys(), path) else {
                continue;
            };
            let Some(extension) = path_extension(path) else {
                continue;
            };
            if let Some(targets) = self.feeds.get(subdir).and_then(|f| f.get(extension)) {
                needs_update.extend(targets.iter().cloned());
            }
        }

        // Upstream side, with passthrough files laid over it.
        let upstream = self
            .upstream
            .prepare(upstream_listing.into_iter().chain(passthrough_entries));
        for op in &upstream.patch {
            let path = op.path();
            let output = self.options.output_dir.join(path);
            match op {
                PatchOp::Unlink { .. } => {
                    needs_update.remove(path);
                    remove_output(runtime, &output, false).await?;
                    summary.removed += 1;
                }
                PatchOp::Rmdir { .. } => {
                    remove_output(runtime, &output, true).await?;
                    summary.removed += 1;
                }
                PatchOp::Mkdir { .. } => {
                    runtime
                        .create_dir(&output, true)
                        .await
                        .map_err(io("create directory", &output))?;
                    summary.directories_created += 1;
                }
                PatchOp::Create { .. } | PatchOp::Change { .. } => {
                    if self.targets.contains_key(path) {
                        needs_update.remove(path);
                        self.regenerate(path, &mut summary).await?;
                    } else if let Some(source) = relocated.get(path) {
                        let from = self.options.generated_dir.join(source);
                        copy(runtime, &from, &output).await?;
                        summary.written += 1;
                    } else {
                        let from = self.options.upstream_dir.join(path);
                        copy(runtime, &from, &output).await?;
                        summary.written += 1;
                    }
                }
            }
        }

        for target in needs_update {
            self.regenerate(&target, &mut summary).await?;
        }

        // only now: a failed build is replayed in full next time
        self.generated.commit(generated.entries);
        self.upstream.commit(upstream.entries);

        info!(
            written = summary.written,
            removed = summary.removed,
            regenerated = summary.regenerated,
            "append build finished"
        );
        Ok(summary)
    }

    /// Passthrough files as upstream entries, plus their output parents.
    ///
    /// Returns the entries and a map from output path to generated path.
    fn relocate_passthrough(
        &self,
        generated: &[FileEntry],
    ) -> (Vec<FileEntry>, BTreeMap<String, String>) {
        let mut entries = Vec::new();
        let mut relocated = BTreeMap::new();

        for (from, to) in &self.options.passthrough {
            let from = trim_slashes(from);
            let to = trim_slashes(to);

            let start = entries.len();
            for entry in generated {
                let Some(rest) = entry
                    .path
                    .strip_prefix(from)
                    .and_then(|rest| rest.strip_prefix('/'))
                else {
                    continue;
                };
                let path = if to.is_empty() {
                    rest.to_string()
                } else {
                    format!("{}/{}", to, rest)
                };
                if !entry.is_directory() {
                    relocated.insert(path.clone(), entry.path.clone());
                }
                entries.push(FileEntry {
                    path,
                    ..entry.clone()
                });
            }

            if entries.len() > start {
                let mut dir = String::new();
                for segment in to.split('/').filter(|s| !s.is_empty()) {
                    if !dir.is_empty() {
                        dir.push('/');
                    }
                    dir.push_str(segment);
                    entries.push(FileEntry::directory(dir.clone()));
                }
            }
        }

        (entries, relocated)
    }

    /// Rebuild one merge target from its upstream file and fragments.
    async fn regenerate(&self, target: &str, summary: &mut AppendSummary) -> Result<(), AppendError> {
        let runtime = self.runtime.as_ref();
        let upstream = self.options.upstream_dir.join(target);
        let output = self.options.output_dir.join(target);

        if !runtime.is_file(&upstream).await {
            remove_output(runtime, &output, false).await?;
            summary.removed += 1;
            return Ok(());
        }

        let Some(source) = self.targets.get(target) else {
            copy(runtime, &upstream, &output).await?;
            summary.written += 1;
            return Ok(());
        };

        let subdir = self.options.generated_dir.join(&source.subdir);
        if !runtime.is_dir(&subdir).await {
            copy(runtime, &upstream, &output).await?;
            summary.written += 1;
            return Ok(());
        }

        let mut fragments = Vec::new();
        for name in runtime
            .read_dir(&subdir)
            .await
            .map_err(io("read directory", &subdir))?
        {
            if path_extension(&name) != Some(source.extension.as_str()) {
                continue;
            }
            let file = subdir.join(&name);
            if !runtime.is_file(&file).await {
                continue;
            }
            fragments.push(runtime.read_to_string(&file).await.map_err(io("read", &file))?);
        }

        if fragments.is_empty() {
            copy(runtime, &upstream, &output).await?;
            summary.written += 1;
            return Ok(());
        }

        let content = runtime
            .read_to_string(&upstream)
            .await
            .map_err(io("read", &upstream))?;
        let merged = splice(&content, &fragments, separator_for(&source.extension));
        write(runtime, &output, merged.as_bytes()).await?;

        debug!(target, fragments = fragments.len(), "regenerated merge target");
        summary.regenerated += 1;
        Ok(())
    }
}

/// Longest `prefix` with `path` equal to it or below it.
fn longest_prefix<'a>(
    prefixes: impl Iterator<Item = &'a String>,
    path: &str,
) -> Option<&'a str> {
    prefixes
        .map(|prefix| trim_slashes(prefix))
        .filter(|prefix| {
            prefix.is_empty()
                || path == *prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .max_by_key(|prefix| prefix.len())
}

async fn write(runtime: &dyn Runtime, path: &Path, content: &[u8]) -> Result<(), AppendError> {
    if let Some(parent) = path.parent() {
        runtime
            .create_dir(parent, true)
            .await
            .map_err(io("create directory", parent))?;
    }
    runtime.write_file(path, content).await.map_err(io("write", path))
}

async fn copy(runtime: &dyn Runtime, from: &Path, to: &Path) -> Result<(), AppendError> {
    let content = runtime.read_file(from).await.map_err(io("read", from))?;
    write(runtime, to, &content).await
}

/// Remove an output file or empty directory; already gone is fine.
async fn remove_output(runtime: &dyn Runtime, path: &Path, is_dir: bool) -> Result<(), AppendError> {
    let result = if is_dir {
        runtime.remove_dir(path).await
    } else {
        runtime.remove_file(path).await
    };
    match result {
        Err(e) if !e.is_not_found() => Err(io("remove", path)(e)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestRuntime;

    fn engine(runtime: &Arc<TestRuntime>) -> AppendEngine {
        let options = AppendOptions::new("/up", "/gen", "/out")
            .with_mapping("assets/vendor.js", "js", "app")
            .with_passthrough("lazy", "assets/lazy");
        AppendEngine::new(options, runtime.clone())
    }

    #[tokio::test]
    async fn copies_upstream_and_merges_targets() {
        let runtime = Arc::new(TestRuntime::new("/"));
        runtime.add_file("/up/index.html", "<html>");
        runtime.add_file("/up/assets/vendor.js", "var v;\n//# sourceMappingURL=vendor.map");
        runtime.add_file("/gen/app/b.js", "b()");
        runtime.add_file("/gen/app/a.js", "a()");
        runtime.add_file("/gen/app/a.css", ".a{}");
        let mut engine = engine(&runtime);

        let summary = engine.build().await.unwrap();

        assert_eq!(runtime.contents("/out/index.html"), "<html>");
        assert_eq!(
            runtime.contents("/out/assets/vendor.js"),
            "var v;\n;\na();\nb()\n//# sourceMappingURL=vendor.map"
        );
        assert_eq!(summary.regenerated, 1);
        assert_eq!(summary.written, 1);
    }

    #[tokio::test]
    async fn second_build_without_changes_does_nothing() {
        let runtime = Arc::new(TestRuntime::new("/"));
        runtime.add_file("/up/assets/vendor.js", "var v;");
        runtime.add_file("/gen/app/a.js", "a()");
        let mut engine = engine(&runtime);

        engine.build().await.unwrap();
        let summary = engine.build().await.unwrap();
        assert!(summary.is_empty(), "{:?}", summary);
    }

    #[tokio::test]
    async fn fragment_change_regenerates_target() {
        let runtime = Arc::new(TestRuntime::new("/"));
        runtime.add_file("/up/assets/vendor.js", "var v;");
        runtime.add_file("/gen/app/a.js", "a()");
        let mut engine = engine(&runtime);
        engine.build().await.unwrap();

        runtime.add_file("/gen/app/a.js", "a2()");
        let summary = engine.build().await.unwrap();

        assert_eq!(summary.regenerated, 1);
        assert_eq!(summary.written, 0);
        assert_eq!(runtime.contents("/out/assets/vendor.js"), "var v;;\na2()");
    }

    #[tokio::test]
    async fn missing_subdir_passes_upstream_through() {
        let runtime = Arc::new(TestRuntime::new("/"));
        runtime.add_file("/up/assets/vendor.js", "var v;\n");
        runtime.add_dir("/gen");
        let mut engine = engine(&runtime);

        engine.build().await.unwrap();
        assert_eq!(runtime.contents("/out/assets/vendor.js"), "var v;\n");
    }

    #[tokio::test]
    async fn removed_upstream_target_is_deleted() {
        let runtime = Arc::new(TestRuntime::new("/"));
        runtime.add_file("/up/assets/vendor.js", "var v;");
        runtime.add_file("/gen/app/a.js", "a()");
        let mut engine = engine(&runtime);
        engine.build().await.unwrap();

        runtime.remove("/up/assets/vendor.js");
        runtime.add_file("/gen/app/a.js", "a3()");
        engine.build().await.unwrap();

        assert!(!runtime.exists(Path::new("/out/assets/vendor.js")));
    }

    #[tokio::test]
    async fn passthrough_files_are_relocated() {
        let runtime = Arc::new(TestRuntime::new("/"));
        runtime.add_file("/up/index.html", "<html>");
        runtime.add_file("/gen/lazy/chunk.1.js", "chunk()");
        let mut engine = engine(&runtime);

        engine.build().await.unwrap();
        assert_eq!(runtime.contents("/out/assets/lazy/chunk.1.js"), "chunk()");

        runtime.remove("/gen/lazy/chunk.1.js");
        engine.build().await.unwrap();
        assert!(!runtime.exists(Path::new("/out/assets/lazy/chunk.1.js")));
    }

    #[tokio::test]
    async fn upstream_removals_reach_the_output() {
        let runtime = Arc::new(TestRuntime::new("/"));
        runtime.add_file("/up/old/a.txt", "a");
        let mut engine = engine(&runtime);
        engine.build().await.unwrap();
        assert_eq!(runtime.contents("/out/old/a.txt"), "a");

        runtime.remove("/up/old");
        let summary = engine.build().await.unwrap();
        assert_eq!(summary.removed, 2);
        assert!(!runtime.exists(Path::new("/out/old")));
    }

    #[tokio::test]
    async fn failed_build_is_replayed() {
        let runtime = Arc::new(TestRuntime::new("/"));
        runtime.add_file("/up/assets/vendor.js", "var v;");
        runtime.add_file("/gen/app/a.js", "a()");
        // a file where the output needs a directory
        runtime.add_file("/out/assets", "stale");
        let mut engine = engine(&runtime);

        assert!(engine.build().await.is_err());
        assert!(engine.build().await.is_err());

        runtime.remove("/out/assets");
        let summary = engine.build().await.unwrap();
        assert_eq!(summary.regenerated, 1);
        assert_eq!(runtime.contents("/out/assets/vendor.js"), "var v;;\na()");
    }
}
