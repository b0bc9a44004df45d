//! Incremental import analysis of source trees.
//!
//! An [`Analyzer`] owns the snapshot of one source tree. Each patch re-parses
//! only created and changed files; the aggregated import list is cached
//! behind a dirty flag and shared as `Arc<[Import]>`.

mod analyzer;
mod cache;
mod import;
mod parser;

pub use analyzer::{AnalyzeError, Analyzer, AnalyzerOptions};
pub use cache::Cached;
pub use import::{Import, LiteralImport, ParsedImport, TEMPLATE_PLACEHOLDER, TemplateImport};
pub use parser::{ModuleParser, OxcModuleParser, ParseError};
