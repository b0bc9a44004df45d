//! `package.json` loading for resolution and version lookups.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ResolveError;
use crate::runtime::Runtime;

/// Maximum allowed size for package.json files (10MB)
const MAX_MANIFEST_SIZE: u64 = 10 * 1024 * 1024;

/// The parts of a `package.json` the resolver reads.
///
/// Entry fields are kept as raw JSON so that any configured field name can be
/// looked up without listing them here.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(flatten)]
    fields: serde_json::Map<String, serde_json::Value>,
    #[serde(skip)]
    pub path: PathBuf,
}

impl PackageManifest {
    /// Load a manifest through the runtime.
    pub async fn from_path(runtime: &dyn Runtime, path: &Path) -> Result<Self, ResolveError> {
        let invalid = |reason: String| ResolveError::InvalidManifest {
            path: path.to_path_buf(),
            reason,
        };

        let metadata = runtime.metadata(path).await?;
        if metadata.size > MAX_MANIFEST_SIZE {
            return Err(invalid(format!(
                "exceeds maximum size of {}MB",
                MAX_MANIFEST_SIZE / 1024 / 1024
            )));
        }

        let content = runtime.read_to_string(path).await?;
        let mut manifest: PackageManifest =
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        manifest.path = path.to_path_buf();
        Ok(manifest)
    }

    /// String value of an entry field such as `main` or `module`.
    ///
    /// Object forms (for example the `browser` replacement map) are ignored.
    pub fn entry_field(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }
}
