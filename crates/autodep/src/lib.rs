#![cfg_attr(docsrs, feature(doc_cfg))]

//! # autodep
//!
//! Incremental discovery of third-party imports and assembly of vendor
//! bundles.
//!
//! - [`tree`]: directory snapshots and ordered patches
//! - [`analysis`]: per-file import extraction with an aggregate cache
//! - [`resolver`]: npm-style specifier resolution with version lookup
//! - [`splitter`]: version checks and assignment of imports to bundles
//! - [`append`]: merging generated bundles into upstream build output
//! - [`pipeline`]: source trees wired through analyzers into a splitter
//!
//! All filesystem access goes through the [`Runtime`] trait.

pub mod analysis;
pub mod append;
pub mod concurrency;
pub mod package;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod runtime;
pub mod splitter;
pub mod tree;

pub mod native_runtime;
pub use native_runtime::NativeRuntime;

// In-memory runtime, for this crate's tests and downstream crates' tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use analysis::{
    AnalyzeError, Analyzer, AnalyzerOptions, Import, LiteralImport, ModuleParser,
    OxcModuleParser, ParseError, TemplateImport,
};
pub use append::{AppendEngine, AppendError, AppendOptions, AppendSummary};
pub use package::Package;
pub use pipeline::{BuildOutcome, Pipeline, PipelineOptions, SourceTree};
pub use registry::{PackageRegistry, RegistryError};
pub use resolver::{PackageResolver, ResolveError, ResolveOptions, ResolvedTarget};
pub use runtime::{FileMetadata, Runtime, RuntimeError, RuntimeResult};
pub use splitter::{
    BundleDependencies, BundleDeps, BundlePolicy, RuleBundlePolicy, SplitError, Splitter,
};
pub use tree::{FileEntry, ListOptions, PatchOp, Snapshot, TokenMode};

pub mod oxc {
    //! OXC types re-exported so custom [`ModuleParser`](crate::ModuleParser)
    //! implementations use the same version as this crate.

    pub use oxc_allocator::Allocator;
    pub use oxc_ast::ast;
    pub use oxc_ast_visit::Visit;
    pub use oxc_parser::{Parser, ParserReturn};
    pub use oxc_span::{GetSpan, SourceType, Span};
}

/// Error type for autodep operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Analyze(#[from] AnalyzeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Append(#[from] AppendError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// I/O error outside the runtime.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for autodep operations.
pub type Result<T> = std::result::Result<T, Error>;
