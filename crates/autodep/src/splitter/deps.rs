use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;

use crate::analysis::{LiteralImport, TEMPLATE_PLACEHOLDER, TemplateImport};

/// A specifier resolved to one installed file, with every use of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedImport {
    pub specifier: String,
    pub entrypoint: PathBuf,
    pub imported_by: Vec<LiteralImport>,
}

/// A template import whose leading quasi resolved into a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTemplateImport {
    pub cooked_quasis: Vec<String>,
    pub expression_name_hints: Vec<Option<String>>,
    /// Package directory joined with the rest of the leading quasi.
    pub entrypoint: PathBuf,
    pub imported_by: Vec<TemplateImport>,
}

impl ResolvedTemplateImport {
    pub fn leading_quasi(&self) -> &str {
        self.cooked_quasis.first().map(String::as_str).unwrap_or_default()
    }

    /// Every literal segment, joined with a placeholder for each expression.
    pub fn key(&self) -> String {
        self.cooked_quasis.join(TEMPLATE_PLACEHOLDER)
    }
}

/// What one bundle has to include.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDependencies {
    pub static_imports: Vec<ResolvedImport>,
    pub dynamic_imports: Vec<ResolvedImport>,
    pub dynamic_template_imports: Vec<ResolvedTemplateImport>,
}

impl BundleDependencies {
    pub fn is_empty(&self) -> bool {
        self.static_imports.is_empty()
            && self.dynamic_imports.is_empty()
            && self.dynamic_template_imports.is_empty()
    }

    pub(crate) fn sort(&mut self) {
        self.static_imports.sort_by(|a, b| a.specifier.cmp(&b.specifier));
        self.dynamic_imports.sort_by(|a, b| a.specifier.cmp(&b.specifier));
        self.dynamic_template_imports.sort_by(|a, b| {
            a.leading_quasi()
                .cmp(b.leading_quasi())
                .then_with(|| a.key().cmp(&b.key()))
        });
    }
}

/// Dependencies of every declared bundle, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BundleDeps {
    bundles: IndexMap<String, BundleDependencies>,
}

impl BundleDeps {
    /// One empty entry per bundle name.
    pub fn with_bundles<'a>(names: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            bundles: names
                .into_iter()
                .map(|name| (name.clone(), BundleDependencies::default()))
                .collect(),
        }
    }

    pub fn get(&self, bundle: &str) -> Option<&BundleDependencies> {
        self.bundles.get(bundle)
    }

    pub(crate) fn get_mut(&mut self, bundle: &str) -> Option<&mut BundleDependencies> {
        self.bundles.get_mut(bundle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BundleDependencies)> {
        self.bundles.iter().map(|(name, deps)| (name.as_str(), deps))
    }

    pub fn bundle_count(&self) -> usize {
        self.bundles.len()
    }

    /// Whether no bundle has any dependency.
    pub fn is_empty(&self) -> bool {
        self.bundles.values().all(BundleDependencies::is_empty)
    }

    pub(crate) fn sort(&mut self) {
        self.bundles.values_mut().for_each(BundleDependencies::sort);
    }

    /// Pretty JSON for diagnostics.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(quasis: &[&str]) -> ResolvedTemplateImport {
        ResolvedTemplateImport {
            cooked_quasis: quasis.iter().map(|q| q.to_string()).collect(),
            expression_name_hints: vec![None; quasis.len() - 1],
            entrypoint: PathBuf::from("/project/node_modules/moment/locale"),
            imported_by: Vec::new(),
        }
    }

    #[test]
    fn templates_sharing_a_prefix_sort_by_key() {
        let keys = |deps: &BundleDependencies| -> Vec<String> {
            deps.dynamic_template_imports.iter().map(|t| t.key()).collect()
        };
        let expected = vec![
            "moment/locale/${e}".to_string(),
            "moment/locale/${e}.js".to_string(),
            "moment/min/${e}".to_string(),
        ];

        for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0]] {
            let all = [
                template(&["moment/locale/", ".js"]),
                template(&["moment/locale/", ""]),
                template(&["moment/min/", ""]),
            ];
            let mut deps = BundleDependencies {
                dynamic_template_imports: order.iter().map(|&i| all[i].clone()).collect(),
                ..BundleDependencies::default()
            };
            deps.sort();
            assert_eq!(keys(&deps), expected);
        }
    }
}
