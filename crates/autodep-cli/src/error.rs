//! Error handling for the CLI.
//!
//! Commands return [`CliError`]; `main` renders it through
//! [`cli_error_to_miette`], attaching a hint where one is known.

use std::path::PathBuf;

use autodep::{AppendError, ResolveError, RuntimeError, SplitError};
use miette::Report;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] autodep_config::ConfigError),

    #[error(transparent)]
    Autodep(#[from] autodep::Error),

    #[error("No [append] section in the configuration")]
    MissingAppendConfig,

    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<AppendError> for CliError {
    fn from(err: AppendError) -> Self {
        CliError::Autodep(err.into())
    }
}

impl From<RuntimeError> for CliError {
    fn from(err: RuntimeError) -> Self {
        CliError::Autodep(err.into())
    }
}

impl From<ResolveError> for CliError {
    fn from(err: ResolveError) -> Self {
        CliError::Autodep(err.into())
    }
}

impl CliError {
    /// What the user can do about it, when we know.
    pub fn hint(&self) -> Option<String> {
        match self {
            CliError::Config(err) => err.hint().map(str::to_string),
            CliError::MissingAppendConfig => Some(
                "Add [append] with upstream_dir, generated_dir, output_dir and mappings".to_string(),
            ),
            CliError::Autodep(autodep::Error::Split(err)) => split_hint(err).map(str::to_string),
            CliError::Autodep(autodep::Error::Resolve(err)) => resolve_hint(err).map(str::to_string),
            _ => None,
        }
    }
}

fn split_hint(err: &SplitError) -> Option<&'static str> {
    match err {
        SplitError::RelativeDynamicImport { .. } | SplitError::RelativeTemplateImport { .. } => {
            Some("Only packages can be imported dynamically; import local modules statically")
        }
        SplitError::ImpreciseTemplateImport { .. } => {
            Some("Start the template with the full package name, e.g. `lodash/${name}`")
        }
        SplitError::VersionConflict { .. } => {
            Some("Align both importers on one installed version of the package")
        }
        SplitError::UnknownBundle { .. } => Some("Declare the bundle in bundles.names"),
        SplitError::Resolve(err) => resolve_hint(err),
        _ => None,
    }
}

fn resolve_hint(err: &ResolveError) -> Option<&'static str> {
    match err {
        ResolveError::EntryNotFound { .. } => {
            Some("Reinstall the package, adjust resolve.main_fields, or add it to package.exclude")
        }
        _ => None,
    }
}

/// Convert a CLI error into a miette report.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err.hint() {
        Some(hint) => miette::miette!(help = hint, "{}", err),
        None => miette::miette!("{}", err),
    }
}
