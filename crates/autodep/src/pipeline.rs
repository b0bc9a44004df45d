//! One incremental analysis build over every configured source tree.
//!
//! ```text
//! source trees ──list──▶ Analyzer (one per tree) ──imports──▶ Splitter ──▶ BundleDeps
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::analysis::{Analyzer, AnalyzerOptions, ModuleParser};
use crate::concurrency::{default_concurrency, map_bounded};
use crate::package::Package;
use crate::resolver::{PackageResolver, ResolveOptions};
use crate::runtime::Runtime;
use crate::splitter::{BundleDeps, BundlePolicy, Splitter};
use crate::tree::{ListOptions, list_tree};
use crate::{Error, Result};

/// A directory of source files owned by one package.
#[derive(Debug, Clone)]
pub struct SourceTree {
    pub root: PathBuf,
    /// Prepended to relative paths, e.g. `"app/"`.
    pub path_prefix: String,
    pub tree_kind: Option<String>,
    pub package: Arc<Package>,
}

impl SourceTree {
    pub fn new(root: impl Into<PathBuf>, package: Arc<Package>) -> Self {
        Self {
            root: root.into(),
            path_prefix: String::new(),
            tree_kind: None,
            package,
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

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub trees: Vec<SourceTree>,
    pub resolve: ResolveOptions,
    pub list_options: ListOptions,
    pub max_concurrency: usize,
}

impl PipelineOptions {
    pub fn new(trees: Vec<SourceTree>) -> Self {
        Self {
            trees,
            resolve: ResolveOptions::default(),
            list_options: ListOptions::default(),
            max_concurrency: default_concurrency(),
        }
    }
}

/// Result of [`Pipeline::build`].
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub deps: Arc<BundleDeps>,
    /// Whether the dependency sets were rebuilt rather than reused.
    pub recomputed: bool,
}

/// Source trees wired to their analyzers and a shared splitter.
#[derive(Debug)]
pub struct Pipeline {
    runtime: Arc<dyn Runtime>,
    list_options: ListOptions,
    max_concurrency: usize,
    analyzers: Vec<Analyzer>,
    splitter: Splitter,
    last_deps: Option<Arc<BundleDeps>>,
}

impl Pipeline {
    pub fn new(
        options: PipelineOptions,
        runtime: Arc<dyn Runtime>,
        parser: Arc<dyn ModuleParser>,
        policy: Arc<dyn BundlePolicy>,
    ) -> Self {
        let analyzers = options
            .trees
            .into_iter()
            .map(|tree| {
                let mut analyzer_options = AnalyzerOptions::new(tree.root)
                    .with_path_prefix(tree.path_prefix);
                analyzer_options.tree_kind = tree.tree_kind;
                analyzer_options.max_concurrency = options.max_concurrency;
                Analyzer::new(
                    tree.package,
                    analyzer_options,
                    Arc::clone(&runtime),
                    Arc::clone(&parser),
                )
            })
            .collect();

        let resolver = Arc::new(PackageResolver::new(Arc::clone(&runtime), options.resolve));
        let splitter =
            Splitter::new(policy, resolver).with_max_concurrency(options.max_concurrency);

        Self {
            runtime,
            list_options: options.list_options,
            max_concurrency: options.max_concurrency,
            analyzers,
            splitter,
            last_deps: None,
        }
    }

    pub fn analyzers(&self) -> &[Analyzer] {
        &self.analyzers
    }

    /// The result of the last successful build.
    pub fn last_deps(&self) -> Option<&Arc<BundleDeps>> {
        self.last_deps.as_ref()
    }

    /// List every tree, feed the analyzers and split the imports.
    pub async fn build(&mut self) -> Result<BuildOutcome> {
        let roots: Vec<PathBuf> = self
            .analyzers
            .iter()
            .map(|analyzer| analyzer.options().tree_root.clone())
            .collect();

        let runtime = Arc::clone(&self.runtime);
        let list_options = self.list_options.clone();
        let listings = map_bounded(roots, self.max_concurrency, move |root| {
            let runtime = Arc::clone(&runtime);
            let list_options = list_options.clone();
            async move { list_tree(runtime.as_ref(), &root, &list_options).await }
        })
        .await
        .map_err(|e| Error::Analyze(e.into()))?;

        for (analyzer, listing) in self.analyzers.iter_mut().zip(listings) {
            analyzer.update(listing?).await?;
        }

        let imports: Vec<_> = self.analyzers.iter_mut().map(Analyzer::imports).collect();
        let before = self.splitter.recomputations();
        let deps = self.splitter.deps(&imports).await?;
        let recomputed = self.splitter.recomputations() != before;

        info!(
            trees = self.analyzers.len(),
            imports = imports.iter().map(|list| list.len()).sum::<usize>(),
            recomputed,
            "analysis build finished"
        );

        self.last_deps = Some(Arc::clone(&deps));
        Ok(BuildOutcome { deps, recomputed })
    }

    /// Write the last build's dependency sets as pretty JSON.
    pub async fn write_deps(&self, path: &Path) -> Result<()> {
        let deps = match &self.last_deps {
            Some(deps) => Arc::clone(deps),
            None => Arc::new(BundleDeps::default()),
        };
        let json = deps.to_json()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.runtime.create_dir(parent, true).await?;
            }
        }
        self.runtime.write_file(path, json.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::OxcModuleParser;
    use crate::splitter::RuleBundlePolicy;
    use crate::test_utils::TestRuntime;

    fn fixture() -> Arc<TestRuntime> {
        let runtime = Arc::new(TestRuntime::new("/project"));
        runtime.add_file(
            "/project/node_modules/left-pad/package.json",
            r#"{"name":"left-pad","version":"1.3.0","main":"index.js"}"#,
        );
        runtime.add_file("/project/node_modules/left-pad/index.js", "module.exports = 1;");
        runtime.add_file(
            "/project/node_modules/chart/package.json",
            r#"{"name":"chart","version":"2.0.0","module":"dist/chart.mjs"}"#,
        );
        runtime.add_file("/project/node_modules/chart/dist/chart.mjs", "export default 1;");
        runtime.add_file("/project/app/app.js", "import pad from 'left-pad';\nimport './local';");
        runtime.add_file("/project/tests/test.js", "const c = import('chart');");
        runtime
    }

    fn pipeline(runtime: &Arc<TestRuntime>) -> Pipeline {
        let package = Arc::new(Package::new("my-app", "/project"));
        let options = PipelineOptions::new(vec![
            SourceTree::new("/project/app", Arc::clone(&package))
                .with_path_prefix("app/")
                .with_tree_kind("app"),
            SourceTree::new("/project/tests", package)
                .with_path_prefix("tests/")
                .with_tree_kind("tests"),
        ]);
        let policy = RuleBundlePolicy::new(["app", "tests"], "app").with_tree_kind("tests", "tests");
        Pipeline::new(
            options,
            runtime.clone(),
            Arc::new(OxcModuleParser::new()),
            Arc::new(policy),
        )
    }

    #[tokio::test]
    async fn builds_deps_for_every_tree() {
        let runtime = fixture();
        let mut pipeline = pipeline(&runtime);

        let outcome = pipeline.build().await.unwrap();
        assert!(outcome.recomputed);

        let app = outcome.deps.get("app").unwrap();
        assert_eq!(app.static_imports.len(), 1);
        assert_eq!(app.static_imports[0].specifier, "left-pad");
        assert!(app.dynamic_imports.is_empty());

        let tests = outcome.deps.get("tests").unwrap();
        assert_eq!(tests.dynamic_imports.len(), 1);
        assert_eq!(
            tests.dynamic_imports[0].entrypoint,
            PathBuf::from("/project/node_modules/chart/dist/chart.mjs")
        );
    }

    #[tokio::test]
    async fn unchanged_trees_reuse_deps() {
        let runtime = fixture();
        let mut pipeline = pipeline(&runtime);

        let first = pipeline.build().await.unwrap();
        let second = pipeline.build().await.unwrap();
        assert!(!second.recomputed);
        assert!(Arc::ptr_eq(&first.deps, &second.deps));

        // same imports, different body
        runtime.add_file(
            "/project/app/app.js",
            "import pad from 'left-pad';\nimport './local';\npad();",
        );
        let third = pipeline.build().await.unwrap();
        assert!(!third.recomputed);

        runtime.add_file("/project/app/app.js", "const c = import('chart');");
        let fourth = pipeline.build().await.unwrap();
        assert!(fourth.recomputed);
        assert!(fourth.deps.get("app").unwrap().static_imports.is_empty());
    }

    #[tokio::test]
    async fn writes_deps_json() {
        let runtime = fixture();
        let mut pipeline = pipeline(&runtime);
        pipeline.build().await.unwrap();

        pipeline.write_deps(Path::new("/project/dist/deps.json")).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&runtime.contents("/project/dist/deps.json")).unwrap();
        assert_eq!(json["app"]["staticImports"][0]["specifier"], "left-pad");
        assert_eq!(
            json["app"]["staticImports"][0]["importedBy"][0]["sourceFile"],
            "app/app.js"
        );
    }

    #[tokio::test]
    async fn failing_file_fails_every_build_until_fixed() {
        let runtime = fixture();
        runtime.add_file("/project/app/bad.js", "import(someVariable);");
        let mut pipeline = pipeline(&runtime);

        let first = pipeline.build().await.unwrap_err();
        assert!(first.to_string().contains("app/bad.js"), "{}", first);
        // nothing changed on disk
        assert!(pipeline.build().await.is_err());

        runtime.add_file("/project/app/bad.js", "import('chart');");
        let outcome = pipeline.build().await.unwrap();
        assert_eq!(outcome.deps.get("app").unwrap().dynamic_imports.len(), 1);
    }
}
