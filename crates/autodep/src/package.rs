//! The package whose source trees are being analyzed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::resolver::{
    PackageManifest, PackageResolver, ResolveError, ResolvedTarget, UNKNOWN_VERSION, package_name,
};
use crate::runtime::Runtime;
use crate::tree::path_extension;

/// Default source extensions picked up by the analyzer.
pub const DEFAULT_FILE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts"];

/// An application or addon that owns source trees.
///
/// The analyzer and splitter only need this flat view: where the package
/// lives, which files it analyzes, and how its specifiers are rewritten
/// before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    pub version: String,
    pub root: PathBuf,
    pub file_extensions: Vec<String>,
    /// Specifier rewrites: `from` or `from/…` becomes `to` or `to/…`.
    pub aliases: BTreeMap<String, String>,
    /// Package names that are never bundled.
    pub exclude: Vec<String>,
}

impl Package {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: UNKNOWN_VERSION.to_string(),
            root: root.into(),
            file_extensions: DEFAULT_FILE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            aliases: BTreeMap::new(),
            exclude: Vec::new(),
        }
    }

    /// Read name and version from `<root>/package.json`.
    pub async fn from_manifest(runtime: &dyn Runtime, root: &Path) -> Result<Self, ResolveError> {
        let manifest = PackageManifest::from_path(runtime, &root.join("package.json")).await?;
        let name = manifest.name.clone().unwrap_or_else(|| {
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        let mut package = Self::new(name, root);
        if let Some(version) = manifest.version {
            package.version = version;
        }
        Ok(package)
    }

    pub fn with_file_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.insert(from.into(), to.into());
        self
    }

    pub fn with_exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the analyzer should parse this `/`-separated path.
    pub fn matches_extension(&self, path: &str) -> bool {
        path_extension(path).is_some_and(|ext| self.file_extensions.iter().any(|e| e == ext))
    }

    /// Whether imports of this specifier's package are left alone.
    pub fn excludes(&self, specifier: &str) -> bool {
        package_name(specifier).is_some_and(|name| self.exclude.iter().any(|e| e == name))
    }

    /// Apply the longest matching alias.
    pub fn alias_for<'a>(&self, specifier: &'a str) -> std::borrow::Cow<'a, str> {
        let matched = self
            .aliases
            .iter()
            .filter(|(from, _)| {
                specifier == from.as_str()
                    || specifier
                        .strip_prefix(from.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(from, _)| from.len());

        match matched {
            Some((from, to)) => format!("{}{}", to, &specifier[from.len()..]).into(),
            None => specifier.into(),
        }
    }

    /// Resolve a specifier written inside this package.
    pub async fn resolve(
        &self,
        resolver: &PackageResolver,
        specifier: &str,
        is_template: bool,
    ) -> Result<ResolvedTarget, ResolveError> {
        let specifier = self.alias_for(specifier);
        resolver.resolve(&self.root, &specifier, is_template).await
    }
}
