//! autodep CLI.
//!
//! - [`cli`] - argument definitions
//! - [`commands`] - `analyze`, `append`, `build`, `watch` and `check`
//! - [`error`] - error types and their miette rendering
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - status lines and summaries
//! - [`watcher`] - filesystem watching for `watch`

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;
pub mod watcher;

pub use error::{CliError, Result};
