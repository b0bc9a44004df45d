//! Shared setup for commands: project root, configuration and the
//! long-lived pipeline and append engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use autodep::{
    AppendEngine, AppendSummary, BuildOutcome, NativeRuntime, OxcModuleParser, Package,
    Pipeline, PipelineOptions, Runtime, SourceTree,
};
use autodep_config::{AutodepConfig, ConfigLoader, ConfigOverrides, LoadedConfig};
use tracing::debug;

use crate::cli::ConfigArgs;
use crate::error::{CliError, Result};

/// Resolve `path` against `cwd` unless it is absolute.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// `--cwd` against the current directory, or the current directory.
pub fn project_root(args: &ConfigArgs) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let root = match &args.cwd {
        Some(dir) => resolve_path(dir, &cwd),
        None => cwd,
    };
    if !root.is_dir() {
        return Err(CliError::DirectoryNotFound(root));
    }
    Ok(root)
}

/// Layer the configuration with the command line on top.
pub fn load_config(args: &ConfigArgs, out: Option<&Path>) -> Result<LoadedConfig> {
    let root = project_root(args)?;
    let cwd = std::env::current_dir()?;

    let overrides = ConfigOverrides {
        max_concurrency: args.concurrency,
        token_mode: args.token_mode.map(Into::into),
        deps_file: out.map(|path| resolve_path(path, &cwd)),
    };

    let mut loader = ConfigLoader::new(&root).with_overrides(overrides);
    if let Some(file) = &args.config {
        loader = loader.with_file(resolve_path(file, &cwd));
    }
    Ok(loader.load()?)
}

/// Read `package.json` when present; otherwise name the package after its
/// directory.
async fn load_package(runtime: &dyn Runtime, config: &AutodepConfig) -> Result<Package> {
    let root = &config.package.root;
    let package = if runtime.exists(&root.join("package.json")) {
        Package::from_manifest(runtime, root).await?
    } else {
        let name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app".to_string());
        Package::new(name, root.clone())
    };
    Ok(config.configure_package(package))
}

pub async fn create_pipeline(config: &AutodepConfig, runtime: Arc<dyn Runtime>) -> Result<Pipeline> {
    let package = Arc::new(load_package(runtime.as_ref(), config).await?);

    let trees = config
        .trees
        .iter()
        .map(|tree| {
            let mut source = SourceTree::new(&tree.root, Arc::clone(&package))
                .with_path_prefix(tree.prefix.clone());
            if let Some(kind) = &tree.kind {
                source = source.with_tree_kind(kind.clone());
            }
            source
        })
        .collect();

    let mut options = PipelineOptions::new(trees);
    options.resolve = config.resolve_options();
    options.list_options = config.list_options();
    if let Some(max_concurrency) = config.settings.max_concurrency {
        options.max_concurrency = max_concurrency;
    }

    debug!(package = %package.name, trees = config.trees.len(), "creating pipeline");
    Ok(Pipeline::new(
        options,
        runtime,
        Arc::new(OxcModuleParser::new()),
        Arc::new(config.bundle_policy()),
    ))
}

pub fn create_append_engine(config: &AutodepConfig, runtime: Arc<dyn Runtime>) -> Result<AppendEngine> {
    let options = config.append_options().ok_or(CliError::MissingAppendConfig)?;
    Ok(AppendEngine::new(options, runtime))
}

/// Pipeline and append engine kept across rebuilds.
pub struct Session {
    pub config: AutodepConfig,
    pipeline: Pipeline,
    append: Option<AppendEngine>,
}

impl Session {
    /// `with_append` requires an `[append]` section.
    pub async fn new(config: AutodepConfig, with_append: bool) -> Result<Self> {
        let runtime: Arc<dyn Runtime> = Arc::new(NativeRuntime::new());
        let pipeline = create_pipeline(&config, Arc::clone(&runtime)).await?;
        let append = if with_append {
            Some(create_append_engine(&config, runtime)?)
        } else {
            None
        };
        Ok(Self {
            config,
            pipeline,
            append,
        })
    }

    /// Analyze and write the snapshot when it changed.
    pub async fn analyze(&mut self) -> Result<BuildOutcome> {
        let outcome = self.pipeline.build().await?;
        let deps_file = &self.config.output.deps_file;
        if outcome.recomputed || !deps_file.exists() {
            self.pipeline.write_deps(deps_file).await?;
        }
        Ok(outcome)
    }

    pub async fn append(&mut self) -> Result<Option<AppendSummary>> {
        match &mut self.append {
            Some(engine) => Ok(Some(engine.build().await?)),
            None => Ok(None),
        }
    }

    /// Paths whose changes never trigger a rebuild.
    pub fn ignored_paths(&self) -> Vec<PathBuf> {
        let mut ignored = vec![self.config.output.deps_file.clone()];
        if let Some(append) = &self.config.append {
            ignored.push(append.output_dir.clone());
        }
        ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_relative_and_absolute() {
        let cwd = Path::new("/project");
        assert_eq!(resolve_path(Path::new("dist"), cwd), PathBuf::from("/project/dist"));
        assert_eq!(resolve_path(Path::new("/tmp/x"), cwd), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn missing_cwd_is_reported() {
        let args = ConfigArgs {
            cwd: Some(PathBuf::from("/definitely/not/here")),
            ..ConfigArgs::default()
        };
        assert!(matches!(project_root(&args), Err(CliError::DirectoryNotFound(_))));
    }
}
