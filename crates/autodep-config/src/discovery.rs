//! Finding the configuration file of a project.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ConfigError, Result};

/// Field of `package.json` that holds inline configuration.
pub const PACKAGE_JSON_FIELD: &str = "autodep";

/// File name looked up first.
pub const CONFIG_FILE: &str = "autodep.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    /// The `autodep` field of a `package.json`.
    PackageJson,
}

/// A configuration file and how to read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub format: ConfigFormat,
}

impl ConfigSource {
    /// Classify an explicitly given file by its name.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = if path.file_name().is_some_and(|name| name == "package.json") {
            ConfigFormat::PackageJson
        } else {
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => ConfigFormat::Toml,
                Some("json") => ConfigFormat::Json,
                _ => return Err(ConfigError::UnsupportedFormat(path)),
            }
        };
        Ok(Self { path, format })
    }
}

/// Searches a project root for its configuration.
///
/// # Example
///
/// ```no_run
/// use autodep_config::ConfigDiscovery;
///
/// let source = ConfigDiscovery::new(".").find();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Searches in this order:
    /// 1. `autodep.toml`
    /// 2. `package.json` with a non-null `autodep` field
    pub fn find(&self) -> Option<ConfigSource> {
        let toml_path = self.root.join(CONFIG_FILE);
        if toml_path.is_file() {
            return Some(ConfigSource {
                path: toml_path,
                format: ConfigFormat::Toml,
            });
        }

        let pkg_path = self.root.join("package.json");
        let content = fs::read_to_string(&pkg_path).ok()?;
        let parsed: Value = serde_json::from_str(&content).ok()?;
        match parsed.get(PACKAGE_JSON_FIELD) {
            Some(field) if !field.is_null() => Some(ConfigSource {
                path: pkg_path,
                format: ConfigFormat::PackageJson,
            }),
            _ => None,
        }
    }

    /// Like [`find`](Self::find), but a missing configuration is an error.
    pub fn require(&self) -> Result<ConfigSource> {
        self.find()
            .ok_or_else(|| ConfigError::NotFound(self.root.clone()))
    }
}
