use std::path::{Path, PathBuf};

use autodep::TokenMode;
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized, Toml},
};
use tracing::debug;

use crate::config::AutodepConfig;
use crate::discovery::{ConfigDiscovery, ConfigFormat, ConfigSource, PACKAGE_JSON_FIELD};
use crate::error::{ConfigError, Result};
use crate::validation::{ConfigValidator, SchemaValidator};

/// Prefix of environment overrides; `__` separates nested keys, as in
/// `AUTODEP_SETTINGS__MAX_CONCURRENCY=2`.
pub const ENV_PREFIX: &str = "AUTODEP_";

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_concurrency: Option<usize>,
    pub token_mode: Option<TokenMode>,
    pub deps_file: Option<PathBuf>,
}

/// Layers configuration sources.
///
/// Priority: CLI overrides > environment > config file > defaults.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
    file: Option<PathBuf>,
    overrides: ConfigOverrides,
}

/// A loaded configuration and the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AutodepConfig,
    pub source: Option<ConfigSource>,
}

impl ConfigLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file: None,
            overrides: ConfigOverrides::default(),
        }
    }

    /// Use this file instead of discovering one. Relative to the root.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn source(&self) -> Result<Option<ConfigSource>> {
        match &self.file {
            Some(file) => {
                let path = self.root.join(file);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path));
                }
                ConfigSource::from_path(path).map(Some)
            }
            None => Ok(ConfigDiscovery::new(&self.root).find()),
        }
    }

    fn figment(&self, source: Option<&ConfigSource>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(AutodepConfig::default()));

        if let Some(source) = source {
            figment = match source.format {
                ConfigFormat::Toml => figment.merge(Toml::file(&source.path)),
                ConfigFormat::Json => figment.merge(Json::file(&source.path)),
                ConfigFormat::PackageJson => {
                    figment.merge(Figment::from(Json::file(&source.path)).focus(PACKAGE_JSON_FIELD))
                }
            };
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let overrides = &self.overrides;
        if let Some(max_concurrency) = overrides.max_concurrency {
            figment = figment.merge(Serialized::default("settings.max_concurrency", max_concurrency));
        }
        if let Some(token_mode) = overrides.token_mode {
            figment = figment.merge(Serialized::default("settings.token_mode", token_mode));
        }
        if let Some(deps_file) = &overrides.deps_file {
            figment = figment.merge(Serialized::default("output.deps_file", deps_file));
        }

        figment
    }

    /// Extract without resolving paths or validating.
    pub fn extract(&self) -> Result<LoadedConfig> {
        let source = self.source()?;
        let config: AutodepConfig = self.figment(source.as_ref()).extract()?;
        Ok(LoadedConfig { config, source })
    }

    /// Extract, resolve relative paths against the root, then validate.
    pub fn load(&self) -> Result<LoadedConfig> {
        let mut loaded = self.extract()?;
        loaded.config.resolve_paths(&self.root);
        SchemaValidator.validate(&loaded.config)?;

        debug!(
            source = ?loaded.source.as_ref().map(|s| &s.path),
            trees = loaded.config.trees.len(),
            "loaded configuration"
        );
        Ok(loaded)
    }
}

/// Load the configuration of the current directory.
///
/// # Example
///
/// ```no_run
/// let loaded = autodep_config::discover().unwrap();
/// println!("{} trees", loaded.config.trees.len());
/// ```
pub fn discover() -> Result<LoadedConfig> {
    let root = std::env::current_dir()?;
    ConfigLoader::new(root).load()
}
