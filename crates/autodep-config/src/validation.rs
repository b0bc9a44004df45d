//! Pluggable config validation strategies
//!
//! [`SchemaValidator`] checks the configuration on its own and runs on every
//! load. [`FsValidator`] additionally checks that configured directories
//! exist; the CLI runs it for `check`.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::config::AutodepConfig;
use crate::error::{ConfigError, Result};

pub trait ConfigValidator {
    fn validate(&self, config: &AutodepConfig) -> Result<()>;
}

fn schema_error(message: impl Into<String>, hint: impl Into<String>) -> ConfigError {
    ConfigError::SchemaValidation {
        message: message.into(),
        hint: Some(hint.into()),
    }
}

/// Validation without filesystem access.
///
/// ```
/// use autodep_config::{AutodepConfig, ConfigValidator, SchemaValidator};
///
/// SchemaValidator.validate(&AutodepConfig::default()).unwrap();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &AutodepConfig) -> Result<()> {
        let bundles = &config.bundles;
        if bundles.names.is_empty() {
            return Err(schema_error(
                "no bundles declared",
                "Declare at least one name in 'bundles.names'",
            ));
        }

        let mut seen = HashSet::new();
        for name in &bundles.names {
            if name.trim().is_empty() {
                return Err(schema_error(
                    "bundle names cannot be empty",
                    "Remove empty strings from 'bundles.names'",
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(schema_error(
                    format!("bundle '{}' is declared twice", name),
                    "Bundle names must be unique",
                ));
            }
        }

        let declared = |bundle: &str, context: &str| {
            if seen.contains(bundle) {
                Ok(())
            } else {
                Err(schema_error(
                    format!("{} refers to undeclared bundle '{}'", context, bundle),
                    format!("Declared bundles: {}", bundles.names.join(", ")),
                ))
            }
        };
        declared(&bundles.default, "'bundles.default'")?;
        for rule in &bundles.rules {
            declared(&rule.bundle, &format!("rule for '{}'", rule.prefix))?;
        }
        for (kind, bundle) in &bundles.tree_kinds {
            declared(bundle, &format!("tree kind '{}'", kind))?;
        }

        if config.trees.is_empty() {
            return Err(schema_error(
                "no source trees configured",
                "Add at least one [[trees]] entry",
            ));
        }
        for tree in &config.trees {
            if tree.root.as_os_str().is_empty() {
                return Err(schema_error(
                    "tree root cannot be empty",
                    "Give every [[trees]] entry a 'root'",
                ));
            }
        }

        if config.resolve.extensions.iter().any(|ext| ext.starts_with('.')) {
            return Err(schema_error(
                "resolve extensions must not start with '.'",
                "Write extensions as \"js\", not \".js\"",
            ));
        }

        if let Some(append) = &config.append {
            for (upstream, by_extension) in &append.mappings {
                if upstream.trim().is_empty() {
                    return Err(schema_error(
                        "append mapping keys cannot be empty",
                        "Use an upstream path such as \"assets/vendor.js\"",
                    ));
                }
                for (extension, subdir) in by_extension {
                    if extension.is_empty() || subdir.trim_matches('/').is_empty() {
                        return Err(schema_error(
                            format!("append mapping for '{}' has an empty extension or directory", upstream),
                            "Map each extension to a generated subdirectory",
                        ));
                    }
                }
            }
            if append.passthrough.keys().any(|from| from.trim_matches('/').is_empty()) {
                return Err(schema_error(
                    "passthrough source prefixes cannot be empty",
                    "Use a generated subdirectory such as \"lazy\"",
                ));
            }
        }

        if config.settings.max_concurrency == Some(0) {
            return Err(schema_error(
                "max_concurrency must be at least 1",
                "Remove 'settings.max_concurrency' to use the CPU count",
            ));
        }

        Ok(())
    }
}

/// Schema validation plus existence checks for configured directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsValidator;

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &AutodepConfig) -> Result<()> {
        SchemaValidator.validate(config)?;

        let mut required: Vec<(PathBuf, &str)> = vec![(config.package.root.clone(), "package root")];
        required.extend(config.trees.iter().map(|tree| (tree.root.clone(), "source tree")));
        if let Some(append) = &config.append {
            required.push((append.upstream_dir.clone(), "append upstream directory"));
        }

        for (path, what) in required {
            if !path.is_dir() {
                return Err(ConfigError::SchemaValidation {
                    message: format!("{} not found: {}", what, path.display()),
                    hint: None,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BundleRuleConfig;

    #[test]
    fn defaults_are_valid() {
        SchemaValidator.validate(&AutodepConfig::default()).unwrap();
    }

    #[test]
    fn duplicate_bundle_names() {
        let mut config = AutodepConfig::default();
        config.bundles.names = vec!["app".into(), "app".into()];
        let err = SchemaValidator.validate(&config).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn rule_to_undeclared_bundle() {
        let mut config = AutodepConfig::default();
        config.bundles.rules.push(BundleRuleConfig {
            prefix: "app/admin/".into(),
            bundle: "admin".into(),
        });
        let err = SchemaValidator.validate(&config).unwrap_err();
        assert!(err.to_string().contains("undeclared bundle 'admin'"));
        assert_eq!(err.hint(), Some("Declared bundles: app, tests"));
    }

    #[test]
    fn zero_concurrency() {
        let mut config = AutodepConfig::default();
        config.settings.max_concurrency = Some(0);
        assert!(SchemaValidator.validate(&config).is_err());
    }
}
