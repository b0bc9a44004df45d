//! Configuration structure for autodep.
//!
//! Relative paths are resolved against the project root by
//! [`AutodepConfig::resolve_paths`] after loading; see `loading` for the
//! layering of sources.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use autodep::{AppendOptions, ListOptions, Package, ResolveOptions, RuleBundlePolicy};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result as ConfigResult};
use crate::settings::Settings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutodepConfig {
    #[serde(default)]
    pub package: PackageConfig,

    #[serde(default = "default_trees")]
    pub trees: Vec<TreeConfig>,

    #[serde(default)]
    pub resolve: ResolveConfig,

    #[serde(default)]
    pub bundles: BundlesConfig,

    #[serde(default)]
    pub append: Option<AppendConfig>,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub settings: Settings,
}

impl Default for AutodepConfig {
    fn default() -> Self {
        Self {
            package: PackageConfig::default(),
            trees: default_trees(),
            resolve: ResolveConfig::default(),
            bundles: BundlesConfig::default(),
            append: None,
            output: OutputConfig::default(),
            settings: Settings::default(),
        }
    }
}

/// The package that owns the source trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Falls back to the `name` in `<root>/package.json`.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Extensions of analyzed files; the library default when absent.
    #[serde(default)]
    pub file_extensions: Option<Vec<String>>,

    #[serde(default)]
    pub aliases: BTreeMap<String, String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: None,
            root: default_root(),
            file_extensions: None,
            aliases: BTreeMap::new(),
            exclude: Vec::new(),
        }
    }
}

/// One analyzed source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    pub root: PathBuf,

    /// Prepended to file paths seen by bundle rules.
    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub kind: Option<String>,
}

impl TreeConfig {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>, kind: Option<&str>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            kind: kind.map(str::to_string),
        }
    }
}

/// Specifier resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_main_fields")]
    pub main_fields: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            main_fields: default_main_fields(),
        }
    }
}

impl From<&ResolveConfig> for ResolveOptions {
    fn from(config: &ResolveConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            main_fields: config.main_fields.clone(),
        }
    }
}

/// Declared bundles and how importing files map onto them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundlesConfig {
    /// Declaration order is priority order.
    #[serde(default = "default_bundle_names")]
    pub names: Vec<String>,

    #[serde(default = "default_bundle")]
    pub default: String,

    /// Path prefix rules, first match wins.
    #[serde(default)]
    pub rules: Vec<BundleRuleConfig>,

    /// Tree kind → bundle; consulted before path rules.
    #[serde(default)]
    pub tree_kinds: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRuleConfig {
    pub prefix: String,
    pub bundle: String,
}

impl Default for BundlesConfig {
    /// `app` and `tests`, with files under `tests/` going to `tests`.
    fn default() -> Self {
        Self {
            names: default_bundle_names(),
            default: default_bundle(),
            rules: vec![BundleRuleConfig {
                prefix: "tests/".to_string(),
                bundle: "tests".to_string(),
            }],
            tree_kinds: BTreeMap::new(),
        }
    }
}

impl From<&BundlesConfig> for RuleBundlePolicy {
    fn from(config: &BundlesConfig) -> Self {
        let mut policy = RuleBundlePolicy::new(config.names.iter().cloned(), config.default.clone());
        for rule in &config.rules {
            policy = policy.with_rule(rule.prefix.clone(), rule.bundle.clone());
        }
        for (kind, bundle) in &config.tree_kinds {
            policy = policy.with_tree_kind(kind.clone(), bundle.clone());
        }
        policy
    }
}

/// Merge of generated bundles into build output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendConfig {
    pub upstream_dir: PathBuf,
    pub generated_dir: PathBuf,
    pub output_dir: PathBuf,

    /// Upstream path → extension → generated subdirectory.
    #[serde(default)]
    pub mappings: BTreeMap<String, BTreeMap<String, String>>,

    /// Generated prefix → output prefix.
    #[serde(default)]
    pub passthrough: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where `analyze` writes the dependency snapshot.
    #[serde(default = "default_deps_file")]
    pub deps_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            deps_file: default_deps_file(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_deps_file() -> PathBuf {
    PathBuf::from("dist/autodep-deps.json")
}

fn default_extensions() -> Vec<String> {
    ResolveOptions::default().extensions
}

fn default_main_fields() -> Vec<String> {
    ResolveOptions::default().main_fields
}

fn default_bundle_names() -> Vec<String> {
    RuleBundlePolicy::default().names
}

fn default_bundle() -> String {
    RuleBundlePolicy::default().default_bundle
}

fn default_trees() -> Vec<TreeConfig> {
    vec![
        TreeConfig::new("app", "app/", Some("app")),
        TreeConfig::new("tests", "tests/", Some("tests")),
    ]
}

impl AutodepConfig {
    /// Create from a JSON value, e.g. the `autodep` field of `package.json`.
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: e.to_string(),
        })
    }

    pub fn to_value(&self) -> ConfigResult<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: e.to_string(),
        })
    }

    /// Render as TOML, e.g. for `check --print`.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: e.to_string(),
        })
    }

    /// Make every relative path absolute against `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        let package_root = absolutize(root, &self.package.root);
        self.package.root = package_root.clone();

        for tree in &mut self.trees {
            tree.root = absolutize(&package_root, &tree.root);
        }
        if let Some(append) = &mut self.append {
            append.upstream_dir = absolutize(root, &append.upstream_dir);
            append.generated_dir = absolutize(root, &append.generated_dir);
            append.output_dir = absolutize(root, &append.output_dir);
        }
        self.output.deps_file = absolutize(root, &self.output.deps_file);
    }

    /// Apply the package section on top of a package read from disk.
    pub fn configure_package(&self, mut package: Package) -> Package {
        if let Some(name) = &self.package.name {
            package.name = name.clone();
        }
        if let Some(extensions) = &self.package.file_extensions {
            package = package.with_file_extensions(extensions.iter().cloned());
        }
        for (from, to) in &self.package.aliases {
            package = package.with_alias(from.clone(), to.clone());
        }
        package.with_exclude(self.package.exclude.iter().cloned())
    }

    pub fn list_options(&self) -> ListOptions {
        let mut options = ListOptions {
            token_mode: self.settings.token_mode,
            ..ListOptions::default()
        };
        if let Some(ignore) = &self.settings.ignore {
            options.ignore = ignore.clone();
        }
        options
    }

    pub fn append_options(&self) -> Option<AppendOptions> {
        self.append.as_ref().map(|append| {
            let mut options = AppendOptions::new(
                &append.upstream_dir,
                &append.generated_dir,
                &append.output_dir,
            );
            options.mappings = append.mappings.clone();
            options.passthrough = append.passthrough.clone();
            options.list_options = self.list_options();
            options
        })
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        (&self.resolve).into()
    }

    pub fn bundle_policy(&self) -> RuleBundlePolicy {
        (&self.bundles).into()
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else if path == Path::new(".") {
        base.to_path_buf()
    } else {
        base.join(path)
    }
}
