//! npm-style package resolution.
//!
//! The resolver answers one question for the splitter: where does a bare
//! specifier land on disk, seen from a given package root? Relative and URL
//! specifiers are classified without touching the filesystem. Package
//! directories are found by walking up through `node_modules`, and entries by
//! trying the configured manifest fields, then the configured extensions,
//! then `index`. A package name with nothing installed behind it resolves to
//! [`ResolvedTarget::NotInstalled`]; an installed package with no usable
//! entry is an error.
//!
//! Resolved entrypoints and version lookups are memoized in `DashMap`s keyed
//! by immutable inputs. Concurrent resolutions of the same key may both do
//! the work; the first insert wins.

mod manifest;
mod specifier;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use path_clean::PathClean;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use manifest::PackageManifest;
pub use specifier::{SpecifierKind, classify, is_precise_prefix, package_name};

use crate::runtime::{Runtime, RuntimeError};

/// Version reported when no enclosing `package.json` declares one.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Errors raised while resolving a package specifier.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Could not resolve an entry for '{specifier}' in '{package_dir}' (from '{from}')")]
    EntryNotFound {
        specifier: String,
        package_dir: PathBuf,
        from: PathBuf,
    },

    #[error("Invalid package.json at '{path}': {reason}")]
    InvalidManifest { path: PathBuf, reason: String },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Resolution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolveOptions {
    /// Extensions tried in order, without the leading dot.
    pub extensions: Vec<String>,
    /// `package.json` fields tried in order for a package's entry.
    pub main_fields: Vec<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            extensions: ["js", "mjs", "cjs", "json"].map(String::from).to_vec(),
            main_fields: ["browser", "module", "main"].map(String::from).to_vec(),
        }
    }
}

/// Where a specifier points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "path", rename_all = "camelCase")]
pub enum ResolvedTarget {
    /// Left to the browser.
    Url,
    /// Relative to the importing file; carries the specifier.
    Local(PathBuf),
    /// A template prefix that does not pin down a package.
    Imprecise,
    /// A package name with no installed package behind it, such as a
    /// module the host provides at runtime.
    NotInstalled,
    /// An installed package file, or for templates the package directory
    /// joined with the rest of the prefix.
    External(PathBuf),
}

type EntryKey = (PathBuf, String, bool);

/// Resolves specifiers against installed packages.
#[derive(Debug)]
pub struct PackageResolver {
    runtime: Arc<dyn Runtime>,
    options: ResolveOptions,
    entrypoints: DashMap<EntryKey, ResolvedTarget, FxBuildHasher>,
    versions: DashMap<PathBuf, Arc<str>, FxBuildHasher>,
}

impl PackageResolver {
    pub fn new(runtime: Arc<dyn Runtime>, options: ResolveOptions) -> Self {
        Self {
            runtime,
            options,
            entrypoints: DashMap::with_hasher(FxBuildHasher),
            versions: DashMap::with_hasher(FxBuildHasher),
        }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve `specifier` as seen from the package rooted at `from_root`.
    ///
    /// With `is_template_prefix` the specifier is the leading literal part of
    /// a template import and only its package boundary is located.
    pub async fn resolve(
        &self,
        from_root: &Path,
        specifier: &str,
        is_template_prefix: bool,
    ) -> Result<ResolvedTarget, ResolveError> {
        let (name, subpath) = match classify(specifier) {
            SpecifierKind::Url => return Ok(ResolvedTarget::Url),
            SpecifierKind::Local => return Ok(ResolvedTarget::Local(PathBuf::from(specifier))),
            SpecifierKind::Package { name, subpath } => (name, subpath),
        };

        if is_template_prefix && !is_precise_prefix(specifier) {
            return Ok(ResolvedTarget::Imprecise);
        }

        let key = (from_root.to_path_buf(), specifier.to_string(), is_template_prefix);
        if let Some(cached) = self.entrypoints.get(&key) {
            return Ok(cached.clone());
        }

        // not cached: a later install must be picked up
        let Some(package_dir) = self.find_package_dir(from_root, name).await else {
            debug!(specifier, package = name, from = %from_root.display(), "package not installed");
            return Ok(ResolvedTarget::NotInstalled);
        };

        let target = if is_template_prefix {
            let rest = specifier[name.len()..].trim_start_matches('/');
            ResolvedTarget::External(package_dir.join(rest))
        } else {
            let entry = match subpath {
                None => self.resolve_directory(&package_dir).await?,
                Some(subpath) => self.resolve_path(&package_dir.join(subpath)).await?,
            };
            let entry = entry.ok_or_else(|| ResolveError::EntryNotFound {
                specifier: specifier.to_string(),
                package_dir: package_dir.clone(),
                from: from_root.to_path_buf(),
            })?;
            ResolvedTarget::External(entry)
        };

        debug!(specifier, from = %from_root.display(), ?target, "resolved specifier");
        Ok(self.entrypoints.entry(key).or_insert(target).clone())
    }

    /// Declared version of the package that owns `entrypoint`.
    ///
    /// Walks up from the entrypoint itself to the nearest `package.json`;
    /// returns [`UNKNOWN_VERSION`] when none declares a version.
    pub async fn version_of(&self, entrypoint: &Path) -> Result<Arc<str>, ResolveError> {
        if let Some(cached) = self.versions.get(entrypoint) {
            return Ok(cached.clone());
        }

        let mut version: Arc<str> = Arc::from(UNKNOWN_VERSION);
        for dir in entrypoint.ancestors() {
            let manifest_path = dir.join("package.json");
            if self.runtime.is_file(&manifest_path).await {
                let manifest = PackageManifest::from_path(self.runtime.as_ref(), &manifest_path).await?;
                if let Some(declared) = manifest.version {
                    version = Arc::from(declared);
                }
                break;
            }
        }

        Ok(self
            .versions
            .entry(entrypoint.to_path_buf())
            .or_insert(version)
            .clone())
    }

    async fn find_package_dir(&self, from_root: &Path, name: &str) -> Option<PathBuf> {
        for dir in from_root.ancestors() {
            let candidate = dir.join("node_modules").join(name);
            if self.runtime.is_dir(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Resolve a path as a file, then as a directory.
    async fn resolve_path(&self, path: &Path) -> Result<Option<PathBuf>, ResolveError> {
        if let Some(file) = self.resolve_file(path).await {
            return Ok(Some(file));
        }
        if self.runtime.is_dir(path).await {
            return self.resolve_directory(path).await;
        }
        Ok(None)
    }

    /// Exact match first, then each configured extension appended.
    async fn resolve_file(&self, path: &Path) -> Option<PathBuf> {
        if self.runtime.is_file(path).await {
            return Some(path.to_path_buf());
        }
        for ext in &self.options.extensions {
            let mut candidate = OsString::from(path.as_os_str());
            candidate.push(".");
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            if self.runtime.is_file(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Manifest entry fields in order, then `index`.
    async fn resolve_directory(&self, dir: &Path) -> Result<Option<PathBuf>, ResolveError> {
        let manifest_path = dir.join("package.json");
        if self.runtime.is_file(&manifest_path).await {
            let manifest = PackageManifest::from_path(self.runtime.as_ref(), &manifest_path).await?;
            for field in &self.options.main_fields {
                let Some(entry) = manifest.entry_field(field) else {
                    continue;
                };
                let candidate = dir.join(entry).clean();
                if let Some(file) = self.resolve_file(&candidate).await {
                    return Ok(Some(file));
                }
                if let Some(index) = self.resolve_file(&candidate.join("index")).await {
                    return Ok(Some(index));
                }
            }
        }
        Ok(self.resolve_file(&dir.join("index")).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestRuntime;

    fn resolver(runtime: TestRuntime) -> PackageResolver {
        PackageResolver::new(Arc::new(runtime), ResolveOptions::default())
    }

    fn external(path: &str) -> ResolvedTarget {
        ResolvedTarget::External(PathBuf::from(path))
    }

    #[tokio::test]
    async fn urls_and_locals_skip_the_filesystem() {
        let resolver = resolver(TestRuntime::new("/app"));
        let root = Path::new("/app");

        assert_eq!(
            resolver.resolve(root, "https://x.io/a.js", false).await.unwrap(),
            ResolvedTarget::Url
        );
        assert_eq!(
            resolver.resolve(root, "./a", false).await.unwrap(),
            ResolvedTarget::Local(PathBuf::from("./a"))
        );
    }

    #[tokio::test]
    async fn entry_fields_in_order() {
        let runtime = TestRuntime::new("/app");
        runtime.add_file(
            "/app/node_modules/dual/package.json",
            r#"{"version":"1.0.0","main":"lib/index.js","module":"es/index"}"#,
        );
        runtime.add_file("/app/node_modules/dual/lib/index.js", "");
        runtime.add_file("/app/node_modules/dual/es/index.mjs", "");
        let resolver = resolver(runtime);

        assert_eq!(
            resolver.resolve(Path::new("/app"), "dual", false).await.unwrap(),
            external("/app/node_modules/dual/es/index.mjs")
        );
    }

    #[tokio::test]
    async fn falls_back_to_index() {
        let runtime = TestRuntime::new("/app");
        runtime.add_file("/app/node_modules/plain/package.json", r#"{"name":"plain"}"#);
        runtime.add_file("/app/node_modules/plain/index.js", "");
        let resolver = resolver(runtime);

        assert_eq!(
            resolver.resolve(Path::new("/app"), "plain", false).await.unwrap(),
            external("/app/node_modules/plain/index.js")
        );
    }

    #[tokio::test]
    async fn subpaths_and_nested_manifests() {
        let runtime = TestRuntime::new("/app");
        runtime.add_file("/app/node_modules/lodash/package.json", r#"{"main":"lodash.js"}"#);
        runtime.add_file("/app/node_modules/lodash/lodash.js", "");
        runtime.add_file("/app/node_modules/lodash/fp/map.js", "");
        runtime.add_file(
            "/app/node_modules/lodash/es/package.json",
            r#"{"module":"main.mjs"}"#,
        );
        runtime.add_file("/app/node_modules/lodash/es/main.mjs", "");
        let resolver = resolver(runtime);
        let root = Path::new("/app");

        assert_eq!(
            resolver.resolve(root, "lodash/fp/map", false).await.unwrap(),
            external("/app/node_modules/lodash/fp/map.js")
        );
        assert_eq!(
            resolver.resolve(root, "lodash/es", false).await.unwrap(),
            external("/app/node_modules/lodash/es/main.mjs")
        );
    }

    #[tokio::test]
    async fn walks_up_to_ancestor_node_modules() {
        let runtime = TestRuntime::new("/repo");
        runtime.add_file("/repo/node_modules/shared/index.js", "");
        runtime.add_dir("/repo/packages/app");
        let resolver = resolver(runtime);

        assert_eq!(
            resolver
                .resolve(Path::new("/repo/packages/app"), "shared", false)
                .await
                .unwrap(),
            external("/repo/node_modules/shared/index.js")
        );
    }

    #[tokio::test]
    async fn scoped_packages() {
        let runtime = TestRuntime::new("/app");
        runtime.add_file("/app/node_modules/@ember/string/index.js", "");
        let resolver = resolver(runtime);

        assert_eq!(
            resolver
                .resolve(Path::new("/app"), "@ember/string", false)
                .await
                .unwrap(),
            external("/app/node_modules/@ember/string/index.js")
        );
    }

    #[tokio::test]
    async fn template_prefixes() {
        let runtime = TestRuntime::new("/app");
        runtime.add_file("/app/node_modules/moment/package.json", r#"{"version":"2.0.0"}"#);
        runtime.add_file("/app/node_modules/moment/locale/de.js", "");
        let resolver = resolver(runtime);
        let root = Path::new("/app");

        assert_eq!(
            resolver.resolve(root, "moment/locale/", true).await.unwrap(),
            external("/app/node_modules/moment/locale/")
        );
        assert_eq!(
            resolver.resolve(root, "mom", true).await.unwrap(),
            ResolvedTarget::Imprecise
        );
    }

    #[tokio::test]
    async fn missing_package_is_not_installed() {
        let runtime = Arc::new(TestRuntime::new("/app"));
        let resolver = PackageResolver::new(runtime.clone(), ResolveOptions::default());
        let root = Path::new("/app");

        assert_eq!(
            resolver.resolve(root, "@ember/component", false).await.unwrap(),
            ResolvedTarget::NotInstalled
        );
        assert_eq!(
            resolver.resolve(root, "ghost/sub/", true).await.unwrap(),
            ResolvedTarget::NotInstalled
        );

        runtime.add_file("/app/node_modules/@ember/component/index.js", "");
        assert_eq!(
            resolver.resolve(root, "@ember/component", false).await.unwrap(),
            external("/app/node_modules/@ember/component/index.js")
        );
    }

    #[tokio::test]
    async fn unresolvable_entry_is_an_error() {
        let runtime = TestRuntime::new("/app");
        runtime.add_file("/app/node_modules/empty/package.json", r#"{"main":"nope.js"}"#);
        let resolver = resolver(runtime);

        let err = resolver
            .resolve(Path::new("/app"), "empty", false)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::EntryNotFound { .. }));
    }

    #[tokio::test]
    async fn version_of_nearest_manifest() {
        let runtime = TestRuntime::new("/app");
        runtime.add_file("/app/node_modules/a/package.json", r#"{"version":"3.1.0"}"#);
        runtime.add_file("/app/node_modules/a/dist/a.js", "");
        runtime.add_file("/loose/file.js", "");
        let resolver = resolver(runtime);

        assert_eq!(
            &*resolver
                .version_of(Path::new("/app/node_modules/a/dist/a.js"))
                .await
                .unwrap(),
            "3.1.0"
        );
        assert_eq!(
            &*resolver.version_of(Path::new("/loose/file.js")).await.unwrap(),
            UNKNOWN_VERSION
        );
    }
}
