//! Resolution of aggregated imports into per-bundle dependency sets.
//!
//! ```text
//! analyzer imports ──▶ resolve (concurrent) ──▶ fold in discovery order
//!                                                 │  dedupe by specifier
//!                                                 │  version conflicts
//!                                                 ▼
//!                                   assign to bundles ──▶ sort ──▶ BundleDeps
//! ```
//!
//! The splitter keeps the previous input and result. When every analyzer
//! hands back the same `Arc` as last time, the previous result is returned
//! without resolving anything.

mod bundle;
mod deps;

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

pub use bundle::{BundlePolicy, BundleRule, RuleBundlePolicy};
pub use deps::{BundleDependencies, BundleDeps, ResolvedImport, ResolvedTemplateImport};

use crate::analysis::{Import, LiteralImport, TemplateImport};
use crate::concurrency::{TaskError, default_concurrency, map_bounded};
use crate::resolver::{PackageResolver, ResolveError, ResolvedTarget};

/// Errors that abort dependency splitting.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error(
        "Relative dynamic import '{specifier}' in '{file}' is not supported; only package imports can be loaded dynamically"
    )]
    RelativeDynamicImport { specifier: String, file: String },

    #[error("Template import with relative prefix '{prefix}' in '{file}' is not supported")]
    RelativeTemplateImport { prefix: String, file: String },

    #[error(
        "Template import in '{file}' must start with a full package name followed by '/', found '{prefix}'"
    )]
    ImpreciseTemplateImport { prefix: String, file: String },

    #[error(
        "Version conflict for '{specifier}': '{first_file}' resolves to {first_entrypoint} ({first_version}) but '{second_file}' resolves to {second_entrypoint} ({second_version})"
    )]
    VersionConflict {
        specifier: String,
        first_file: String,
        first_entrypoint: PathBuf,
        first_version: String,
        second_file: String,
        second_entrypoint: PathBuf,
        second_version: String,
    },

    #[error("Bundle policy assigned '{path}' to unknown bundle '{bundle}' (valid: {valid})")]
    UnknownBundle {
        path: String,
        bundle: String,
        valid: String,
    },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Turns analyzer output into [`BundleDeps`].
#[derive(Debug)]
pub struct Splitter {
    policy: Arc<dyn BundlePolicy>,
    resolver: Arc<PackageResolver>,
    max_concurrency: usize,
    last_input: Option<Vec<Arc<[Import]>>>,
    last_deps: Option<Arc<BundleDeps>>,
    recomputations: usize,
}

impl Splitter {
    pub fn new(policy: Arc<dyn BundlePolicy>, resolver: Arc<PackageResolver>) -> Self {
        Self {
            policy,
            resolver,
            max_concurrency: default_concurrency(),
            last_input: None,
            last_deps: None,
            recomputations: 0,
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// How many times the dependency sets were rebuilt from scratch.
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    /// Dependencies for the current import lists, one list per analyzer.
    pub async fn deps(&mut self, imports: &[Arc<[Import]>]) -> Result<Arc<BundleDeps>, SplitError> {
        if let (Some(last_input), Some(last_deps)) = (&self.last_input, &self.last_deps) {
            if same_lists(last_input, imports) {
                return Ok(Arc::clone(last_deps));
            }
        }

        let deps = Arc::new(self.compute(imports).await?);
        self.recomputations += 1;
        self.last_input = Some(imports.to_vec());
        self.last_deps = Some(Arc::clone(&deps));
        Ok(deps)
    }

    async fn compute(&self, imports: &[Arc<[Import]>]) -> Result<BundleDeps, SplitError> {
        let mut literals = Vec::new();
        let mut templates = Vec::new();
        for import in imports.iter().flat_map(|list| list.iter()) {
            match import {
                Import::Literal(literal) => {
                    if !literal.package.excludes(&literal.specifier) {
                        literals.push(literal.clone());
                    }
                }
                Import::Template(template) => {
                    if !template.package.excludes(template.leading_quasi()) {
                        templates.push(template.clone());
                    }
                }
            }
        }

        let literal_targets = self.fold_literals(literals).await?;
        let template_targets = self.fold_templates(templates).await?;

        let mut deps = BundleDeps::with_bundles(self.policy.names());
        for target in literal_targets.into_values() {
            let (statics, dynamics): (Vec<_>, Vec<_>) =
                target.imported_by.into_iter().partition(|i| !i.is_dynamic);

            for (imported_by, is_dynamic) in [(statics, false), (dynamics, true)] {
                if imported_by.is_empty() {
                    continue;
                }
                let bundle = self.choose_bundle(
                    imported_by
                        .iter()
                        .map(|i| (i.source_file.as_str(), i.tree_kind.as_deref())),
                )?;
                let resolved = ResolvedImport {
                    specifier: target.specifier.clone(),
                    entrypoint: target.entrypoint.clone(),
                    imported_by,
                };
                if let Some(bundle) = deps.get_mut(&bundle) {
                    if is_dynamic {
                        bundle.dynamic_imports.push(resolved);
                    } else {
                        bundle.static_imports.push(resolved);
                    }
                }
            }
        }

        for target in template_targets.into_values() {
            let bundle = self.choose_bundle(
                target
                    .imported_by
                    .iter()
                    .map(|i| (i.source_file.as_str(), i.tree_kind.as_deref())),
            )?;
            if let Some(bundle) = deps.get_mut(&bundle) {
                bundle.dynamic_template_imports.push(target);
            }
        }

        deps.sort();
        info!(bundles = deps.bundle_count(), "computed bundle dependencies");
        Ok(deps)
    }

    async fn fold_literals(
        &self,
        literals: Vec<LiteralImport>,
    ) -> Result<IndexMap<String, ResolvedImport>, SplitError> {
        let resolver = Arc::clone(&self.resolver);
        let resolved = map_bounded(literals, self.max_concurrency, move |import| {
            let resolver = Arc::clone(&resolver);
            async move {
                let target = import
                    .package
                    .resolve(&resolver, &import.specifier, false)
                    .await;
                (import, target)
            }
        })
        .await?;

        let mut targets: IndexMap<String, ResolvedImport> = IndexMap::new();
        for (import, target) in resolved {
            let entrypoint = match target? {
                ResolvedTarget::External(entrypoint) => entrypoint,
                ResolvedTarget::Local(_) if import.is_dynamic => {
                    return Err(SplitError::RelativeDynamicImport {
                        specifier: import.specifier,
                        file: import.source_file,
                    });
                }
                ResolvedTarget::Url
                | ResolvedTarget::Local(_)
                | ResolvedTarget::Imprecise
                | ResolvedTarget::NotInstalled => continue,
            };

            match targets.get_mut(&import.specifier) {
                Some(existing) => {
                    if existing.entrypoint != entrypoint {
                        let first_file = existing
                            .imported_by
                            .first()
                            .map(|i| i.source_file.clone())
                            .unwrap_or_default();
                        self.check_versions(
                            &import.specifier,
                            (first_file.as_str(), &existing.entrypoint),
                            (import.source_file.as_str(), &entrypoint),
                        )
                        .await?;
                    }
                    existing.imported_by.push(import);
                }
                None => {
                    debug!(specifier = %import.specifier, entrypoint = %entrypoint.display(), "new dependency");
                    targets.insert(
                        import.specifier.clone(),
                        ResolvedImport {
                            specifier: import.specifier.clone(),
                            entrypoint,
                            imported_by: vec![import],
                        },
                    );
                }
            }
        }
        Ok(targets)
    }

    async fn fold_templates(
        &self,
        templates: Vec<TemplateImport>,
    ) -> Result<IndexMap<String, ResolvedTemplateImport>, SplitError> {
        let resolver = Arc::clone(&self.resolver);
        let resolved = map_bounded(templates, self.max_concurrency, move |import| {
            let resolver = Arc::clone(&resolver);
            async move {
                let target = import
                    .package
                    .resolve(&resolver, import.leading_quasi(), true)
                    .await;
                (import, target)
            }
        })
        .await?;

        let mut targets: IndexMap<String, ResolvedTemplateImport> = IndexMap::new();
        for (import, target) in resolved {
            let entrypoint = match target? {
                ResolvedTarget::External(entrypoint) => entrypoint,
                ResolvedTarget::Url | ResolvedTarget::NotInstalled => continue,
                ResolvedTarget::Local(_) => {
                    return Err(SplitError::RelativeTemplateImport {
                        prefix: import.leading_quasi().to_string(),
                        file: import.source_file,
                    });
                }
                ResolvedTarget::Imprecise => {
                    return Err(SplitError::ImpreciseTemplateImport {
                        prefix: import.leading_quasi().to_string(),
                        file: import.source_file,
                    });
                }
            };

            let key = import.key();
            match targets.get_mut(&key) {
                Some(existing) => {
                    if existing.entrypoint != entrypoint {
                        let first_file = existing
                            .imported_by
                            .first()
                            .map(|i| i.source_file.clone())
                            .unwrap_or_default();
                        self.check_versions(
                            &key,
                            (first_file.as_str(), &existing.entrypoint),
                            (import.source_file.as_str(), &entrypoint),
                        )
                        .await?;
                    }
                    existing.imported_by.push(import);
                }
                None => {
                    targets.insert(
                        key,
                        ResolvedTemplateImport {
                            cooked_quasis: import.cooked_quasis.clone(),
                            expression_name_hints: import.expression_name_hints.clone(),
                            entrypoint,
                            imported_by: vec![import],
                        },
                    );
                }
            }
        }
        Ok(targets)
    }

    /// Two entrypoints for one specifier are fine when their versions match.
    async fn check_versions(
        &self,
        specifier: &str,
        (first_file, first_entrypoint): (&str, &PathBuf),
        (second_file, second_entrypoint): (&str, &PathBuf),
    ) -> Result<(), SplitError> {
        let first_version = self.resolver.version_of(first_entrypoint).await?;
        let second_version = self.resolver.version_of(second_entrypoint).await?;
        if first_version == second_version {
            debug!(specifier, version = %first_version, "same version at two entrypoints");
            return Ok(());
        }
        Err(SplitError::VersionConflict {
            specifier: specifier.to_string(),
            first_file: first_file.to_string(),
            first_entrypoint: first_entrypoint.clone(),
            first_version: first_version.to_string(),
            second_file: second_file.to_string(),
            second_entrypoint: second_entrypoint.clone(),
            second_version: second_version.to_string(),
        })
    }

    /// The first declared bundle used by any of the importers.
    fn choose_bundle<'a>(
        &self,
        importers: impl Iterator<Item = (&'a str, Option<&'a str>)>,
    ) -> Result<String, SplitError> {
        let names = self.policy.names();
        let mut best: Option<usize> = None;

        for (path, tree_kind) in importers {
            let bundle = tree_kind
                .and_then(|kind| self.policy.bundle_for_tree_kind(kind))
                .unwrap_or_else(|| self.policy.bundle_for_path(path));
            let index = names.iter().position(|name| *name == bundle).ok_or_else(|| {
                SplitError::UnknownBundle {
                    path: path.to_string(),
                    bundle: bundle.clone(),
                    valid: names.join(", "),
                }
            })?;
            best = Some(best.map_or(index, |b| b.min(index)));
        }

        Ok(best
            .and_then(|index| names.get(index))
            .cloned()
            .unwrap_or_default())
    }
}

fn same_lists(previous: &[Arc<[Import]>], next: &[Arc<[Import]>]) -> bool {
    previous.len() == next.len() && previous.iter().zip(next).all(|(a, b)| Arc::ptr_eq(a, b))
}
