use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Decides which output bundle an importing file belongs to.
pub trait BundlePolicy: Send + Sync + std::fmt::Debug {
    /// Declared bundle names; declaration order is priority order.
    fn names(&self) -> &[String];

    /// Bundle for an importing file, by its prefixed path.
    fn bundle_for_path(&self, path: &str) -> String;

    /// Bundle for a tree kind, when the policy assigns by kind.
    fn bundle_for_tree_kind(&self, _tree_kind: &str) -> Option<String> {
        None
    }
}

/// Path prefix mapped to a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRule {
    pub prefix: String,
    pub bundle: String,
}

/// [`BundlePolicy`] driven by configuration.
///
/// Tree kinds are consulted first, then path rules in order, then the
/// default bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleBundlePolicy {
    pub names: Vec<String>,
    #[serde(default)]
    pub rules: Vec<BundleRule>,
    #[serde(default)]
    pub tree_kinds: BTreeMap<String, String>,
    pub default_bundle: String,
}

impl RuleBundlePolicy {
    pub fn new<I, S>(names: I, default_bundle: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            rules: Vec::new(),
            tree_kinds: BTreeMap::new(),
            default_bundle: default_bundle.into(),
        }
    }

    pub fn with_rule(mut self, prefix: impl Into<String>, bundle: impl Into<String>) -> Self {
        self.rules.push(BundleRule {
            prefix: prefix.into(),
            bundle: bundle.into(),
        });
        self
    }

    pub fn with_tree_kind(mut self, kind: impl Into<String>, bundle: impl Into<String>) -> Self {
        self.tree_kinds.insert(kind.into(), bundle.into());
        self
    }
}

impl Default for RuleBundlePolicy {
    /// `app` and `tests`, with files under `tests/` going to `tests`.
    fn default() -> Self {
        Self::new(["app", "tests"], "app")
            .with_rule("tests/", "tests")
            .with_tree_kind("tests", "tests")
    }
}

impl BundlePolicy for RuleBundlePolicy {
    fn names(&self) -> &[String] {
        &self.names
    }

    fn bundle_for_path(&self, path: &str) -> String {
        self.rules
            .iter()
            .find(|rule| path.starts_with(&rule.prefix))
            .map(|rule| rule.bundle.clone())
            .unwrap_or_else(|| self.default_bundle.clone())
    }

    fn bundle_for_tree_kind(&self, tree_kind: &str) -> Option<String> {
        self.tree_kinds.get(tree_kind).cloned()
    }
}
