use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::tree::{ListOptions, path_extension};

/// Inputs and merge rules of an [`super::AppendEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendOptions {
    /// Build output to merge into.
    pub upstream_dir: PathBuf,
    /// Output of the external bundler, one subdirectory per bundle.
    pub generated_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Upstream path → extension → generated subdirectory.
    ///
    /// A key with the mapped extension is the target itself
    /// (`assets/vendor.js` + `js`); any other key gets the extension appended
    /// (`assets/vendor` + `css` targets `assets/vendor.css`).
    #[serde(default)]
    pub mappings: BTreeMap<String, BTreeMap<String, String>>,
    /// Generated path prefix → output path prefix, copied without merging.
    #[serde(default)]
    pub passthrough: BTreeMap<String, String>,
    #[serde(default)]
    pub list_options: ListOptions,
}

impl AppendOptions {
    pub fn new(
        upstream_dir: impl Into<PathBuf>,
        generated_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            upstream_dir: upstream_dir.into(),
            generated_dir: generated_dir.into(),
            output_dir: output_dir.into(),
            mappings: BTreeMap::new(),
            passthrough: BTreeMap::new(),
            list_options: ListOptions::default(),
        }
    }

    pub fn with_mapping(
        mut self,
        upstream: impl Into<String>,
        extension: impl Into<String>,
        subdir: impl Into<String>,
    ) -> Self {
        self.mappings
            .entry(upstream.into())
            .or_default()
            .insert(extension.into(), subdir.into());
        self
    }

    pub fn with_passthrough(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.passthrough.insert(from.into(), to.into());
        self
    }

    /// Every merge target with the subdirectory and extension feeding it.
    pub fn merge_targets(&self) -> BTreeMap<String, MergeSource> {
        let mut targets = BTreeMap::new();
        for (upstream, by_extension) in &self.mappings {
            for (extension, subdir) in by_extension {
                let target = if path_extension(upstream) == Some(extension.as_str()) {
                    upstream.clone()
                } else {
                    format!("{}.{}", upstream, extension)
                };
                targets.insert(
                    target,
                    MergeSource {
                        subdir: trim_slashes(subdir).to_string(),
                        extension: extension.clone(),
                    },
                );
            }
        }
        targets
    }
}

/// The generated files appended to one merge target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSource {
    pub subdir: String,
    pub extension: String,
}

pub(crate) fn trim_slashes(path: &str) -> &str {
    path.trim_matches('/')
}
